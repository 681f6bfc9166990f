//! In-memory property graph with the same write semantics as the FalkorDB adapter.
//!
//! Backs `--dry-run` loads and the test suite. Faults can be injected per statement,
//! and the rendered statements can be kept for inspection with [`MemoryGraphStore::with_history`].

use crate::error::StoreError;
use crate::storage::cypher;
use crate::storage::graph_store::{Endpoint, GraphStore, Quoting, Statement, StoreConnector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

type FaultFn = Box<dyn Fn(&Statement<'_>) -> Option<StoreError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNode {
    pub label: String,
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEdge {
    pub source: usize,
    pub target: usize,
    pub rel_type: String,
}

#[derive(Debug, Default)]
struct MemoryGraph {
    nodes: Vec<StoredNode>,
    by_uri: HashMap<(String, String), Vec<usize>>,
    edges: Vec<StoredEdge>,
    indexes: HashSet<(String, String)>,
    history: Option<Vec<String>>,
}

impl MemoryGraph {
    fn find(&self, label: &str, uri: &str) -> Option<usize> {
        self.by_uri
            .get(&(label.to_string(), uri.to_string()))
            .and_then(|ids| ids.first().copied())
    }

    fn apply(&mut self, statement: &Statement<'_>) -> Result<(), StoreError> {
        match statement {
            Statement::ClearGraph => {
                self.nodes.clear();
                self.by_uri.clear();
                self.edges.clear();
            }
            Statement::CreateIndex { label, attribute } => {
                if !self.indexes.insert((label.to_string(), attribute.to_string())) {
                    return Err(StoreError::IndexExists(format!("{}({})", label, attribute)));
                }
            }
            Statement::DropIndex { label, attribute } => {
                if !self.indexes.remove(&(label.to_string(), attribute.to_string())) {
                    return Err(StoreError::IndexMissing(format!("{}({})", label, attribute)));
                }
            }
            Statement::CreateNode { label, uri, name } => {
                let uri = uri.stored_value().into_owned();
                let id = self.nodes.len();
                self.by_uri.entry((label.to_string(), uri.clone())).or_default().push(id);
                self.nodes.push(StoredNode {
                    label: label.to_string(),
                    uri,
                    name: name.stored_value().into_owned(),
                });
            }
            Statement::CreateEdge { label, rel_type, source, target } => {
                let source_uri = source.stored_value();
                let target_uri = target.stored_value();
                match (self.find(label, &source_uri), self.find(label, &target_uri)) {
                    (Some(source), Some(target)) => self.edges.push(StoredEdge {
                        source,
                        target,
                        rel_type: rel_type.to_string(),
                    }),
                    _ => {
                        return Err(StoreError::NoMatch(format!("{} -> {}", source_uri, target_uri)))
                    }
                }
            }
        }
        Ok(())
    }
}

/// A single in-memory graph. Keeps no statement history unless asked to.
#[derive(Default)]
pub struct MemoryGraphStore {
    graph: Mutex<MemoryGraph>,
    fault: Option<FaultFn>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement for which `fault` returns an error, before it is applied.
    pub fn with_fault<F>(fault: F) -> Self
    where
        F: Fn(&Statement<'_>) -> Option<StoreError> + Send + Sync + 'static,
    {
        Self { graph: Mutex::new(MemoryGraph::default()), fault: Some(Box::new(fault)) }
    }

    /// A store that records every statement it receives.
    pub fn recording() -> Self {
        Self::new().with_history()
    }

    /// Start recording the Cypher rendering of every statement received from now on.
    pub fn with_history(self) -> Self {
        self.lock().history.get_or_insert_with(Vec::new);
        self
    }

    /// Reject node writes that carry an escaped quote, as a strict store parser would.
    pub fn rejecting_escaped_quotes() -> Self {
        Self::with_fault(|statement| match statement {
            Statement::CreateNode { uri, name, .. }
                if [uri, name].iter().any(|v| {
                    v.quoting == Quoting::Escape && v.value.contains('\'')
                }) =>
            {
                Some(StoreError::Query("unexpected quote in string literal".to_string()))
            }
            _ => None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, MemoryGraph> {
        self.graph.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    pub fn edges_of_type(&self, rel_type: &str) -> usize {
        self.lock().edges.iter().filter(|e| e.rel_type == rel_type).count()
    }

    pub fn has_index(&self, label: &str, attribute: &str) -> bool {
        self.lock().indexes.contains(&(label.to_string(), attribute.to_string()))
    }

    /// First node stored under `uri`, any label.
    pub fn node(&self, uri: &str) -> Option<StoredNode> {
        self.lock().nodes.iter().find(|n| n.uri == uri).cloned()
    }

    /// Endpoints of every stored edge of `rel_type`, as uris.
    pub fn edges(&self, rel_type: &str) -> Vec<(String, String)> {
        let graph = self.lock();
        graph
            .edges
            .iter()
            .filter(|e| e.rel_type == rel_type)
            .map(|e| (graph.nodes[e.source].uri.clone(), graph.nodes[e.target].uri.clone()))
            .collect()
    }

    /// Cypher rendering of every statement received, failed ones included.
    /// Empty unless the store records history.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone().unwrap_or_default()
    }

    pub fn is_recording(&self) -> bool {
        self.lock().history.is_some()
    }
}

impl GraphStore for MemoryGraphStore {
    async fn execute(&self, statement: &Statement<'_>) -> Result<(), StoreError> {
        let mut graph = self.lock();
        if let Some(history) = graph.history.as_mut() {
            history.push(cypher::render(statement));
        }

        if let Some(err) = self.fault.as_ref().and_then(|fault| fault(statement)) {
            return Err(err);
        }
        graph.apply(statement)
    }
}

/// Hands out in-memory graphs by name, creating them on first use.
#[derive(Default)]
pub struct MemoryConnector {
    graphs: Mutex<HashMap<String, Arc<MemoryGraphStore>>>,
    unreachable: bool,
    recording: bool,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose every connection attempt is refused.
    pub fn unreachable() -> Self {
        Self { unreachable: true, ..Self::default() }
    }

    /// A connector whose graphs, once created by it, record their statement history.
    pub fn recording() -> Self {
        Self { recording: true, ..Self::default() }
    }

    /// Register a prepared store under `graph_name`.
    pub fn with_graph(self, graph_name: &str, store: MemoryGraphStore) -> Self {
        self.graphs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(graph_name.to_string(), Arc::new(store));
        self
    }

    pub fn graph(&self, graph_name: &str) -> Option<Arc<MemoryGraphStore>> {
        self.graphs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(graph_name)
            .cloned()
    }
}

impl StoreConnector for MemoryConnector {
    type Store = Arc<MemoryGraphStore>;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        graph_name: &str,
    ) -> Result<Arc<MemoryGraphStore>, StoreError> {
        if self.unreachable {
            return Err(StoreError::Connection(format!(
                "connection refused ({}:{})",
                endpoint.host, endpoint.port
            )));
        }
        let mut graphs = self.graphs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let recording = self.recording;
        let store = graphs.entry(graph_name.to_string()).or_insert_with(|| {
            Arc::new(if recording { MemoryGraphStore::recording() } else { MemoryGraphStore::new() })
        });
        Ok(Arc::clone(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sanitize;
    use crate::storage::Quoted;

    fn node<'a>(uri: &'a str, name: &'a str, quoting: Quoting) -> Statement<'a> {
        Statement::CreateNode {
            label: "Resource",
            uri: Quoted::new(uri, quoting),
            name: Quoted::new(name, quoting),
        }
    }

    #[tokio::test]
    async fn test_edges_need_both_endpoints() {
        let store = MemoryGraphStore::new();
        store.execute(&node("http://ex.org/a", "a", Quoting::Escape)).await.unwrap();

        let rel = sanitize("knows");
        let edge = Statement::CreateEdge {
            label: "Resource",
            rel_type: &rel,
            source: Quoted::new("http://ex.org/a", Quoting::Escape),
            target: Quoted::new("http://ex.org/b", Quoting::Escape),
        };
        assert!(matches!(store.execute(&edge).await, Err(StoreError::NoMatch(_))));

        store.execute(&node("http://ex.org/b", "b", Quoting::Escape)).await.unwrap();
        store.execute(&edge).await.unwrap();
        assert_eq!(store.edges_of_type("knows"), 1);
        assert_eq!(store.edges("knows"), vec![("http://ex.org/a".to_string(), "http://ex.org/b".to_string())]);
    }

    #[tokio::test]
    async fn test_index_errors() {
        let store = MemoryGraphStore::new();
        let create = Statement::CreateIndex { label: "Resource", attribute: "uri" };
        let drop = Statement::DropIndex { label: "Resource", attribute: "uri" };

        assert!(matches!(store.execute(&drop).await, Err(StoreError::IndexMissing(_))));
        store.execute(&create).await.unwrap();
        assert!(matches!(store.execute(&create).await, Err(StoreError::IndexExists(_))));
        assert!(store.has_index("Resource", "uri"));
        store.execute(&drop).await.unwrap();
        assert!(!store.has_index("Resource", "uri"));
    }

    #[tokio::test]
    async fn test_stripped_values_are_stored_without_quotes() {
        let store = MemoryGraphStore::rejecting_escaped_quotes().with_history();
        let escaped = node("http://ex.org/o'clock", "o'clock", Quoting::Escape);
        assert!(store.execute(&escaped).await.is_err());

        let stripped = node("http://ex.org/o'clock", "o'clock", Quoting::Strip);
        store.execute(&stripped).await.unwrap();
        assert_eq!(store.node("http://ex.org/oclock").unwrap().name, "oclock");
        assert_eq!(store.history().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_keeps_indexes() {
        let store = MemoryGraphStore::new();
        store.execute(&Statement::CreateIndex { label: "Resource", attribute: "uri" }).await.unwrap();
        store.execute(&node("http://ex.org/a", "a", Quoting::Escape)).await.unwrap();
        store.execute(&Statement::ClearGraph).await.unwrap();
        assert_eq!(store.node_count(), 0);
        assert!(store.has_index("Resource", "uri"));
    }

    #[tokio::test]
    async fn test_connector_selects_graph_by_name() {
        let connector = MemoryConnector::new();
        let endpoint = Endpoint::default();
        let first = connector.connect(&endpoint, "wordnet").await.unwrap();
        first.execute(&node("http://ex.org/a", "a", Quoting::Escape)).await.unwrap();

        let again = connector.connect(&endpoint, "wordnet").await.unwrap();
        assert_eq!(again.node_count(), 1);
        let other = connector.connect(&endpoint, "other").await.unwrap();
        assert_eq!(other.node_count(), 0);

        let refused = MemoryConnector::unreachable().connect(&endpoint, "wordnet").await;
        assert!(matches!(refused, Err(StoreError::Connection(_))));
    }

    #[tokio::test]
    async fn test_history_is_opt_in() {
        let plain = MemoryGraphStore::new();
        plain.execute(&node("http://ex.org/a", "a", Quoting::Escape)).await.unwrap();
        plain.execute(&Statement::ClearGraph).await.unwrap();
        assert!(!plain.is_recording());
        assert!(plain.history().is_empty());

        let endpoint = Endpoint::default();
        let dry_run = MemoryConnector::new().connect(&endpoint, "wordnet").await.unwrap();
        dry_run.execute(&node("http://ex.org/a", "a", Quoting::Escape)).await.unwrap();
        assert!(dry_run.history().is_empty());

        let recorded = MemoryConnector::recording().connect(&endpoint, "wordnet").await.unwrap();
        recorded.execute(&node("http://ex.org/a", "a", Quoting::Escape)).await.unwrap();
        assert_eq!(recorded.history(), vec!["CREATE (n:Resource {uri: 'http://ex.org/a', name: 'a'})"]);
    }
}
