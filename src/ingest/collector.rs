//! Triple collection: the deduplicated node table, per-type edge groups and the
//! relationship-type histogram for one load.

use crate::core::{Edge, Node, NodeId, RelationshipType, Term, Triple};
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

/// Nodes keyed by full URI (or literal string), first label wins.
#[derive(Debug, Default)]
pub struct NodeTable {
    index: HashMap<String, NodeId>,
    nodes: Vec<Node>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the node for `term`, inserting it when the URI has not been seen yet.
    pub fn insert(&mut self, term: Term) -> NodeId {
        if let Some(&id) = self.index.get(&term.value) {
            return id;
        }
        let id = self.nodes.len() as NodeId;
        let label = term.display_label();
        self.index.insert(term.value.clone(), id);
        self.nodes.push(Node { uri: term.value, label });
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn id_of(&self, uri: &str) -> Option<NodeId> {
        self.index.get(uri).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order, which is first-seen order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// All edges sharing one relationship type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeGroup {
    pub rel_type: RelationshipType,
    pub edges: Vec<Edge>,
}

/// Edges grouped by relationship type, groups in first-seen order.
#[derive(Debug, Default)]
pub struct EdgeGroups {
    index: HashMap<RelationshipType, usize>,
    groups: Vec<EdgeGroup>,
}

impl EdgeGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rel_type: &RelationshipType, edge: Edge) {
        let slot = match self.index.get(rel_type) {
            Some(&slot) => slot,
            None => {
                self.index.insert(rel_type.clone(), self.groups.len());
                self.groups.push(EdgeGroup { rel_type: rel_type.clone(), edges: Vec::new() });
                self.groups.len() - 1
            }
        };
        self.groups[slot].edges.push(edge);
    }

    pub fn get(&self, rel_type: &str) -> Option<&EdgeGroup> {
        self.index.get(rel_type).map(|&slot| &self.groups[slot])
    }

    pub fn groups(&self) -> &[EdgeGroup] {
        &self.groups
    }

    /// Number of relationship types.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_edges(&self) -> usize {
        self.groups.iter().map(|g| g.edges.len()).sum()
    }
}

/// Number of triples seen per relationship type.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct RelationshipHistogram {
    counts: HashMap<RelationshipType, u64>,
}

impl RelationshipHistogram {
    pub fn increment(&mut self, rel_type: &RelationshipType) {
        match self.counts.get_mut(rel_type) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(rel_type.clone(), 1);
            }
        }
    }

    pub fn get(&self, rel_type: &str) -> u64 {
        self.counts.get(rel_type).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// The `n` most frequent types, count descending, ties by name.
    pub fn top(&self, n: usize) -> Vec<(RelationshipType, u64)> {
        let mut entries: Vec<_> = self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }
}

/// Everything the writer needs, handed over when collection finishes.
#[derive(Debug, Default)]
pub struct Collection {
    pub nodes: NodeTable,
    pub edges: EdgeGroups,
    pub histogram: RelationshipHistogram,
    pub triples_processed: usize,
}

/// Consumes triples into a [`Collection`].
#[derive(Debug)]
pub struct TripleCollector {
    progress_interval: usize,
    predicates: HashMap<String, RelationshipType>,
    collection: Collection,
}

impl TripleCollector {
    /// `progress_interval` of 0 disables progress lines.
    pub fn new(progress_interval: usize) -> Self {
        Self { progress_interval, predicates: HashMap::new(), collection: Collection::default() }
    }

    /// Add one triple: both endpoints into the node table, then the edge and histogram entry.
    pub fn push(&mut self, triple: Triple) {
        let rel_type = match self.predicates.get(&triple.predicate) {
            Some(rel_type) => rel_type.clone(),
            None => {
                let rel_type = RelationshipType::from_predicate(&triple.predicate);
                self.predicates.insert(triple.predicate, rel_type.clone());
                rel_type
            }
        };

        let collection = &mut self.collection;
        let source = collection.nodes.insert(triple.subject);
        let target = collection.nodes.insert(triple.object);
        collection.edges.push(&rel_type, Edge { source, target });
        collection.histogram.increment(&rel_type);
        collection.triples_processed += 1;
    }

    /// Consume `triples` in source order, stopping after `limit` triples when given.
    pub fn collect<I>(mut self, triples: I, limit: Option<usize>) -> Collection
    where
        I: IntoIterator<Item = Triple>,
    {
        let triples = triples.into_iter().take(limit.unwrap_or(usize::MAX));
        let expected = triples.size_hint().0;
        let start = Instant::now();

        for triple in triples {
            self.push(triple);

            let count = self.collection.triples_processed;
            if self.progress_interval > 0 && count % self.progress_interval == 0 {
                let elapsed = start.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 { count as f64 / elapsed } else { 0.0 };
                info!(
                    "  Processed {}/{} triples ({:.0} triples/sec, {} nodes)",
                    count,
                    expected,
                    rate,
                    self.collection.nodes.len()
                );
            }
        }

        self.finish()
    }

    pub fn finish(self) -> Collection {
        self.collection
    }
}
