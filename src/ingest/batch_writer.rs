//! Batched writes of a collected node table and its edge groups.
//!
//! Every record is its own statement and its own `Result`; a failed record is
//! counted, recorded and skipped. The only retry is the quote-stripping fallback
//! for node writes.

use crate::core::{Edge, Node, NodeId, RelationshipType};
use crate::error::StoreError;
use crate::ingest::collector::{EdgeGroup, EdgeGroups, NodeTable};
use crate::storage::{contains_quote, GraphStore, Quoted, Quoting, Statement, URI_ATTRIBUTE};
use futures_util::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// When the uri lookup index is dropped and rebuilt around the writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IndexStrategy {
    /// Drop before any write, recreate after all writes.
    #[default]
    Bracket,
    /// Drop before node writes, recreate before edge writes so matches use it.
    RebuildBeforeEdges,
    /// Make sure the index exists up front and never drop it.
    KeepOnline,
}

impl IndexStrategy {
    pub fn drops_index(self) -> bool {
        !matches!(self, IndexStrategy::KeepOnline)
    }
}

/// Batch sizes, index handling and edge-group concurrency for one load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchingPolicy {
    pub node_batch_size: usize,
    pub edge_batch_size: usize,
    pub index_strategy: IndexStrategy,
    /// Relationship-type groups written at the same time. 1 writes them in order.
    pub edge_concurrency: usize,
}

impl Default for BatchingPolicy {
    fn default() -> Self {
        Self {
            node_batch_size: 5000,
            edge_batch_size: 500,
            index_strategy: IndexStrategy::Bracket,
            edge_concurrency: 1,
        }
    }
}

/// How often progress lines are logged. A zero disables that line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPolicy {
    /// Triples between collector progress lines.
    pub collect_interval: usize,
    /// Node batches between node progress lines.
    pub node_progress_batches: usize,
    /// Completed relationship types between edge progress lines.
    pub edge_progress_types: usize,
    /// Edge writes between running-total lines.
    pub edge_progress_records: usize,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            collect_interval: 10_000,
            node_progress_batches: 10,
            edge_progress_types: 10,
            edge_progress_records: 50_000,
        }
    }
}

fn every(count: usize, interval: usize) -> bool {
    interval > 0 && count > 0 && count % interval == 0
}

/// One record the store did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFailure {
    pub target: String,
    pub reason: String,
}

impl WriteFailure {
    fn node(node: &Node, err: &StoreError) -> Self {
        Self { target: node.uri.clone(), reason: err.to_string() }
    }

    fn edge(source: &str, rel_type: &RelationshipType, target: &str, err: &StoreError) -> Self {
        Self { target: format!("{} -[{}]-> {}", source, rel_type, target), reason: err.to_string() }
    }
}

/// Failures kept for the report, at most `cap` of them. Counting happens elsewhere.
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    cap: usize,
    recorded: Vec<WriteFailure>,
    omitted: usize,
}

impl FailureLog {
    pub fn with_cap(cap: usize) -> Self {
        Self { cap, recorded: Vec::new(), omitted: 0 }
    }

    pub fn record(&mut self, failure: WriteFailure) {
        if self.recorded.len() < self.cap {
            self.recorded.push(failure);
        } else {
            self.omitted += 1;
        }
    }

    pub fn extend(&mut self, other: FailureLog) {
        self.omitted += other.omitted;
        for failure in other.recorded {
            self.record(failure);
        }
    }

    pub fn omitted(&self) -> usize {
        self.omitted
    }

    pub fn into_vec(self) -> Vec<WriteFailure> {
        self.recorded
    }
}

/// What happened to one node write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Stored, with the quoting the store accepted.
    Written(Quoting),
    Failed,
}

#[derive(Debug, Default)]
pub struct NodeWriteReport {
    pub created: usize,
    pub failed: usize,
    pub failures: FailureLog,
    states: Vec<NodeState>,
}

impl NodeWriteReport {
    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.states.get(id as usize).copied()
    }

    /// Quoting to match a node by. Failed or unknown nodes are matched as escaped.
    pub fn quoting(&self, id: NodeId) -> Quoting {
        match self.state(id) {
            Some(NodeState::Written(quoting)) => quoting,
            _ => Quoting::Escape,
        }
    }
}

/// Outcome for one relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReport {
    pub rel_type: RelationshipType,
    /// Edges in the group, one per collected triple.
    pub triples: usize,
    /// Write batches of at most `edge_batch_size` edges.
    pub batches: usize,
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct EdgeWriteReport {
    pub created: usize,
    pub failed: usize,
    /// In group order, whatever order the groups finished in.
    pub per_type: Vec<TypeReport>,
    pub failures: FailureLog,
}

/// Result of one index create or drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    Applied,
    /// Already created, or already gone.
    Unchanged,
    Failed(StoreError),
}

impl IndexOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, IndexOutcome::Failed(_))
    }
}

/// Issues node, edge and index statements against one store.
pub struct BatchWriter<'a, S> {
    store: &'a S,
    label: &'a str,
    policy: &'a BatchingPolicy,
    progress: &'a ProgressPolicy,
    max_recorded_failures: usize,
}

impl<'a, S: GraphStore> BatchWriter<'a, S> {
    pub fn new(
        store: &'a S,
        label: &'a str,
        policy: &'a BatchingPolicy,
        progress: &'a ProgressPolicy,
        max_recorded_failures: usize,
    ) -> Self {
        Self { store, label, policy, progress, max_recorded_failures }
    }

    pub async fn drop_index(&self) -> IndexOutcome {
        let statement = Statement::DropIndex { label: self.label, attribute: URI_ATTRIBUTE };
        match self.store.execute(&statement).await {
            Ok(()) => {
                info!("Dropped index on :{}({})", self.label, URI_ATTRIBUTE);
                IndexOutcome::Applied
            }
            Err(StoreError::IndexMissing(msg)) => {
                debug!("No index to drop: {}", msg);
                IndexOutcome::Unchanged
            }
            Err(err) => {
                warn!("Could not drop index on :{}({}): {}", self.label, URI_ATTRIBUTE, err);
                IndexOutcome::Failed(err)
            }
        }
    }

    pub async fn create_index(&self) -> IndexOutcome {
        let statement = Statement::CreateIndex { label: self.label, attribute: URI_ATTRIBUTE };
        match self.store.execute(&statement).await {
            Ok(()) => {
                info!("Created index on :{}({})", self.label, URI_ATTRIBUTE);
                IndexOutcome::Applied
            }
            Err(StoreError::IndexExists(msg)) => {
                debug!("Index already present: {}", msg);
                IndexOutcome::Unchanged
            }
            Err(err) => {
                warn!("Could not create index on :{}({}): {}", self.label, URI_ATTRIBUTE, err);
                IndexOutcome::Failed(err)
            }
        }
    }

    /// Index step before any write: drop it, or under `KeepOnline` make sure it exists.
    pub async fn prepare_index(&self) -> IndexOutcome {
        if self.policy.index_strategy.drops_index() {
            self.drop_index().await
        } else {
            self.create_index().await
        }
    }

    /// Index step between node and edge writes, if the strategy has one.
    pub async fn index_after_nodes(&self) -> Option<IndexOutcome> {
        match self.policy.index_strategy {
            IndexStrategy::RebuildBeforeEdges => Some(self.create_index().await),
            _ => None,
        }
    }

    /// Index step after every write, if the strategy has one.
    pub async fn index_after_edges(&self) -> Option<IndexOutcome> {
        match self.policy.index_strategy {
            IndexStrategy::Bracket => Some(self.create_index().await),
            _ => None,
        }
    }

    async fn create_node(&self, node: &Node, quoting: Quoting) -> Result<(), StoreError> {
        let statement = Statement::CreateNode {
            label: self.label,
            uri: Quoted::new(&node.uri, quoting),
            name: Quoted::new(&node.label, quoting),
        };
        self.store.execute(&statement).await
    }

    /// Write one node, falling back once to stripped quotes when it carries any.
    ///
    /// `uri_taken` tells whether a stripped uri already belongs to another node; such a
    /// node is abandoned instead, so edges can never match the wrong endpoint.
    pub async fn write_node<F>(&self, node: &Node, uri_taken: F) -> Result<Quoting, WriteFailure>
    where
        F: Fn(&str) -> bool,
    {
        let err = match self.create_node(node, Quoting::Escape).await {
            Ok(()) => return Ok(Quoting::Escape),
            Err(err) => err,
        };
        if !contains_quote(&node.uri) && !contains_quote(&node.label) {
            return Err(WriteFailure::node(node, &err));
        }

        let stripped = Quoted::new(&node.uri, Quoting::Strip).stored_value();
        if stripped != node.uri.as_str() && uri_taken(stripped.as_ref()) {
            warn!("Not retrying {}: without quotes it collides with node {}", node.uri, stripped);
            return Err(WriteFailure {
                target: node.uri.clone(),
                reason: format!("{}; uri without quotes collides with {}", err, stripped),
            });
        }

        debug!("Retrying node {} without quotes after: {}", node.uri, err);
        self.create_node(node, Quoting::Strip)
            .await
            .map(|()| Quoting::Strip)
            .map_err(|err| WriteFailure::node(node, &err))
    }

    pub async fn write_nodes(&self, table: &NodeTable) -> NodeWriteReport {
        let total = table.len();
        let batch_size = self.policy.node_batch_size.max(1);
        let batches = total.div_ceil(batch_size);
        info!("Writing {} nodes in {} batches of up to {}", total, batches, batch_size);

        let start = Instant::now();
        let mut report = NodeWriteReport {
            failures: FailureLog::with_cap(self.max_recorded_failures),
            states: Vec::with_capacity(total),
            ..Default::default()
        };

        let mut stripped_uris: HashSet<String> = HashSet::new();

        for (batch_no, batch) in table.nodes().chunks(batch_size).enumerate() {
            for node in batch {
                let written = self
                    .write_node(node, |uri| table.id_of(uri).is_some() || stripped_uris.contains(uri))
                    .await;
                match written {
                    Ok(quoting) => {
                        if quoting == Quoting::Strip {
                            let stored = Quoted::new(&node.uri, quoting).stored_value();
                            stripped_uris.insert(stored.into_owned());
                        }
                        report.created += 1;
                        report.states.push(NodeState::Written(quoting));
                    }
                    Err(failure) => {
                        debug!("Node write failed for {}: {}", failure.target, failure.reason);
                        report.failed += 1;
                        report.states.push(NodeState::Failed);
                        report.failures.record(failure);
                    }
                }
            }

            let done = batch_no + 1;
            if every(done, self.progress.node_progress_batches) || done == batches {
                let written = report.created + report.failed;
                let elapsed = start.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 { written as f64 / elapsed } else { 0.0 };
                info!(
                    "  Nodes: {}/{} written ({} failed, {:.0} nodes/sec)",
                    written, total, report.failed, rate
                );
            }
        }

        if report.failed > 0 {
            warn!("{} of {} nodes could not be written", report.failed, total);
        }
        report
    }

    async fn write_group(
        &self,
        table: &NodeTable,
        nodes: &NodeWriteReport,
        group: &EdgeGroup,
        running: &AtomicUsize,
    ) -> (TypeReport, FailureLog) {
        let mut report = TypeReport {
            rel_type: group.rel_type.clone(),
            triples: group.edges.len(),
            batches: 0,
            created: 0,
            failed: 0,
        };
        let mut failures = FailureLog::with_cap(self.max_recorded_failures);
        let batch_size = self.policy.edge_batch_size.max(1);
        let batches = group.edges.len().div_ceil(batch_size);

        for batch in group.edges.chunks(batch_size) {
            let start = Instant::now();
            let failed_before = report.failed;
            for edge in batch {
                match self.write_edge(table, nodes, &group.rel_type, *edge).await {
                    Ok(()) => report.created += 1,
                    Err(failure) => {
                        debug!("Edge write failed for {}: {}", failure.target, failure.reason);
                        report.failed += 1;
                        failures.record(failure);
                    }
                }

                let written = running.fetch_add(1, Ordering::Relaxed) + 1;
                if every(written, self.progress.edge_progress_records) {
                    info!("  Edges: {} written so far", written);
                }
            }

            report.batches += 1;
            let elapsed = start.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 { batch.len() as f64 / elapsed } else { 0.0 };
            debug!(
                "  {} batch {}/{}: {} edges, {} failed ({:.0} edges/sec)",
                report.rel_type,
                report.batches,
                batches,
                batch.len(),
                report.failed - failed_before,
                rate
            );
        }
        (report, failures)
    }

    async fn write_edge(
        &self,
        table: &NodeTable,
        nodes: &NodeWriteReport,
        rel_type: &RelationshipType,
        edge: Edge,
    ) -> Result<(), WriteFailure> {
        let (Some(source), Some(target)) = (table.get(edge.source), table.get(edge.target)) else {
            let err = StoreError::NoMatch(format!("node ids {} -> {}", edge.source, edge.target));
            return Err(WriteFailure::edge("?", rel_type, "?", &err));
        };

        let statement = Statement::CreateEdge {
            label: self.label,
            rel_type,
            source: Quoted::new(&source.uri, nodes.quoting(edge.source)),
            target: Quoted::new(&target.uri, nodes.quoting(edge.target)),
        };
        self.store
            .execute(&statement)
            .await
            .map_err(|err| WriteFailure::edge(&source.uri, rel_type, &target.uri, &err))
    }

    /// Write every edge group, up to `edge_concurrency` groups at a time.
    pub async fn write_edges(
        &self,
        table: &NodeTable,
        groups: &EdgeGroups,
        nodes: &NodeWriteReport,
    ) -> EdgeWriteReport {
        let type_count = groups.len();
        let concurrency = self.policy.edge_concurrency.max(1);
        info!(
            "Writing {} edges across {} relationship types (batch size {}, {} concurrent)",
            groups.total_edges(),
            type_count,
            self.policy.edge_batch_size,
            concurrency
        );

        let running = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let running = &running;
        let completed = &completed;

        let mut results: Vec<(usize, TypeReport, FailureLog)> =
            stream::iter(groups.groups().iter().enumerate())
                .map(|(slot, group)| async move {
                    let (report, failures) = self.write_group(table, nodes, group, running).await;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if every(done, self.progress.edge_progress_types) || done == type_count {
                        info!(
                            "  Relationship types: {}/{} done (last: {}, {} created, {} failed)",
                            done, type_count, report.rel_type, report.created, report.failed
                        );
                    }
                    (slot, report, failures)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;
        results.sort_by_key(|(slot, _, _)| *slot);

        let mut report = EdgeWriteReport {
            failures: FailureLog::with_cap(self.max_recorded_failures),
            ..Default::default()
        };
        for (_, type_report, failures) in results {
            report.created += type_report.created;
            report.failed += type_report.failed;
            report.failures.extend(failures);
            report.per_type.push(type_report);
        }

        if report.failed > 0 {
            warn!("{} of {} edges could not be written", report.failed, groups.total_edges());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Term, Triple};
    use crate::ingest::collector::{Collection, TripleCollector};
    use crate::storage::MemoryGraphStore;

    fn collect(triples: &[(&str, &str, &str)]) -> Collection {
        let triples = triples
            .iter()
            .map(|(s, p, o)| Triple::new(Term::iri(*s), *p, Term::iri(*o)))
            .collect::<Vec<_>>();
        TripleCollector::new(0).collect(triples, None)
    }

    fn writer<'a>(
        store: &'a MemoryGraphStore,
        policy: &'a BatchingPolicy,
        progress: &'a ProgressPolicy,
    ) -> BatchWriter<'a, MemoryGraphStore> {
        BatchWriter::new(store, "Resource", policy, progress, 10)
    }

    #[tokio::test]
    async fn test_writes_nodes_and_edges() {
        let collection = collect(&[
            ("http://ex.org/A", "http://ex.org/has_color", "http://ex.org/B"),
            ("http://ex.org/A", "http://ex.org/has_color", "http://ex.org/C"),
            ("http://ex.org/B", "http://ex.org/near", "http://ex.org/C"),
        ]);
        let store = MemoryGraphStore::new();
        let policy = BatchingPolicy { node_batch_size: 2, edge_batch_size: 1, ..Default::default() };
        let progress = ProgressPolicy { node_progress_batches: 1, ..Default::default() };
        let writer = writer(&store, &policy, &progress);

        let nodes = writer.write_nodes(&collection.nodes).await;
        assert_eq!(nodes.created, 3);
        assert_eq!(nodes.failed, 0);

        let edges = writer.write_edges(&collection.nodes, &collection.edges, &nodes).await;
        assert_eq!(edges.created, 3);
        assert_eq!(edges.failed, 0);
        assert_eq!(edges.per_type.len(), 2);
        assert_eq!(edges.per_type[0].rel_type.as_str(), "has_color");
        assert_eq!(edges.per_type[0].triples, 2);
        assert_eq!(store.edges_of_type("near"), 1);
    }

    #[tokio::test]
    async fn test_edge_groups_are_written_in_batches() {
        let triples: Vec<(String, String, String)> = (0..5)
            .map(|i| ("http://ex.org/s".to_string(), "http://ex.org/p".to_string(), format!("http://ex.org/o{i}")))
            .collect();
        let borrowed: Vec<(&str, &str, &str)> =
            triples.iter().map(|(s, p, o)| (s.as_str(), p.as_str(), o.as_str())).collect();
        let collection = collect(&borrowed);
        let store = MemoryGraphStore::new();
        let policy = BatchingPolicy { edge_batch_size: 2, ..Default::default() };
        let progress = ProgressPolicy::default();
        let writer = writer(&store, &policy, &progress);

        let nodes = writer.write_nodes(&collection.nodes).await;
        let edges = writer.write_edges(&collection.nodes, &collection.edges, &nodes).await;
        assert_eq!(edges.per_type[0].triples, 5);
        assert_eq!(edges.per_type[0].batches, 3);
        assert_eq!(edges.created, 5);
    }

    #[tokio::test]
    async fn test_stripped_uri_never_merges_into_existing_node() {
        let collection = collect(&[
            ("http://ex.org/a'b", "http://ex.org/p", "http://ex.org/x"),
            ("http://ex.org/ab", "http://ex.org/q", "http://ex.org/y"),
        ]);
        let store = MemoryGraphStore::rejecting_escaped_quotes();
        let policy = BatchingPolicy::default();
        let progress = ProgressPolicy::default();
        let writer = writer(&store, &policy, &progress);

        let nodes = writer.write_nodes(&collection.nodes).await;
        assert_eq!(nodes.created, 3);
        assert_eq!(nodes.failed, 1);
        assert_eq!(nodes.state(0), Some(NodeState::Failed));
        let failures = nodes.failures.clone().into_vec();
        assert_eq!(failures[0].target, "http://ex.org/a'b");
        assert!(failures[0].reason.contains("collides with http://ex.org/ab"));

        let edges = writer.write_edges(&collection.nodes, &collection.edges, &nodes).await;
        assert_eq!(edges.created, 1);
        assert_eq!(edges.failed, 1);
        assert!(store.edges("p").is_empty());
        assert_eq!(store.edges("q"), vec![("http://ex.org/ab".to_string(), "http://ex.org/y".to_string())]);
    }

    #[tokio::test]
    async fn test_stripped_uris_do_not_collide_with_each_other() {
        let collection = collect(&[("http://ex.org/a'b", "http://ex.org/p", "http://ex.org/a''b")]);
        let store = MemoryGraphStore::rejecting_escaped_quotes();
        let policy = BatchingPolicy::default();
        let progress = ProgressPolicy::default();
        let writer = writer(&store, &policy, &progress);

        let nodes = writer.write_nodes(&collection.nodes).await;
        assert_eq!(nodes.created, 1);
        assert_eq!(nodes.failed, 1);
        assert_eq!(nodes.state(0), Some(NodeState::Written(Quoting::Strip)));
        assert_eq!(nodes.state(1), Some(NodeState::Failed));
        assert_eq!(store.node_count(), 1);
    }

    #[tokio::test]
    async fn test_quoted_node_falls_back_to_stripped_quotes() {
        let collection = collect(&[("http://ex.org/o'clock", "http://ex.org/p", "http://ex.org/b")]);
        let store = MemoryGraphStore::rejecting_escaped_quotes();
        let policy = BatchingPolicy::default();
        let progress = ProgressPolicy::default();
        let writer = writer(&store, &policy, &progress);

        let nodes = writer.write_nodes(&collection.nodes).await;
        assert_eq!(nodes.created, 2);
        assert_eq!(nodes.failed, 0);
        assert_eq!(nodes.state(0), Some(NodeState::Written(Quoting::Strip)));
        assert!(store.node("http://ex.org/oclock").is_some());

        let edges = writer.write_edges(&collection.nodes, &collection.edges, &nodes).await;
        assert_eq!(edges.created, 1);
        assert_eq!(store.edges("p"), vec![("http://ex.org/oclock".to_string(), "http://ex.org/b".to_string())]);
    }

    #[tokio::test]
    async fn test_failed_fallback_counts_once_and_continues() {
        let collection = collect(&[
            ("http://ex.org/it's", "http://ex.org/p", "http://ex.org/b"),
            ("http://ex.org/c", "http://ex.org/p", "http://ex.org/d"),
        ]);
        let store = MemoryGraphStore::with_fault(|statement| match statement {
            Statement::CreateNode { uri, .. } if uri.value.contains('\'') => {
                Some(StoreError::Query("rejected".to_string()))
            }
            _ => None,
        })
        .with_history();
        let policy = BatchingPolicy::default();
        let progress = ProgressPolicy::default();
        let writer = writer(&store, &policy, &progress);

        let nodes = writer.write_nodes(&collection.nodes).await;
        assert_eq!(nodes.failed, 1);
        assert_eq!(nodes.created, 3);
        assert_eq!(nodes.state(0), Some(NodeState::Failed));
        assert_eq!(nodes.failures.clone().into_vec().len(), 1);
        // one escaped attempt, one stripped attempt, then the remaining nodes
        assert_eq!(store.history().len(), 5);

        let edges = writer.write_edges(&collection.nodes, &collection.edges, &nodes).await;
        assert_eq!(edges.created, 1);
        assert_eq!(edges.failed, 1);
        assert_eq!(edges.created + edges.failed, collection.triples_processed);
    }

    #[tokio::test]
    async fn test_unquoted_failure_is_not_retried() {
        let collection = collect(&[("http://ex.org/a", "http://ex.org/p", "http://ex.org/b")]);
        let store = MemoryGraphStore::with_fault(|statement| match statement {
            Statement::CreateNode { uri, .. } if uri.value.ends_with("/a") => {
                Some(StoreError::Query("rejected".to_string()))
            }
            _ => None,
        })
        .with_history();
        let policy = BatchingPolicy::default();
        let progress = ProgressPolicy::default();
        let nodes = writer(&store, &policy, &progress).write_nodes(&collection.nodes).await;

        assert_eq!(nodes.failed, 1);
        assert_eq!(store.history().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_groups_report_in_group_order() {
        let triples: Vec<(String, String, String)> = (0..40)
            .map(|i| {
                (
                    format!("http://ex.org/s{}", i % 9),
                    format!("http://ex.org/p{}", i % 5),
                    format!("http://ex.org/o{}", i % 4),
                )
            })
            .collect();
        let borrowed: Vec<(&str, &str, &str)> =
            triples.iter().map(|(s, p, o)| (s.as_str(), p.as_str(), o.as_str())).collect();
        let collection = collect(&borrowed);

        let store = MemoryGraphStore::new();
        let policy = BatchingPolicy { edge_concurrency: 3, edge_batch_size: 2, ..Default::default() };
        let progress = ProgressPolicy { edge_progress_types: 2, edge_progress_records: 7, ..Default::default() };
        let writer = writer(&store, &policy, &progress);

        let nodes = writer.write_nodes(&collection.nodes).await;
        let edges = writer.write_edges(&collection.nodes, &collection.edges, &nodes).await;

        let order: Vec<&str> = edges.per_type.iter().map(|t| t.rel_type.as_str()).collect();
        assert_eq!(order, vec!["p0", "p1", "p2", "p3", "p4"]);
        assert_eq!(edges.created, 40);
        assert_eq!(store.edge_count(), 40);
    }

    #[tokio::test]
    async fn test_index_outcomes() {
        let store = MemoryGraphStore::new();
        let policy = BatchingPolicy::default();
        let progress = ProgressPolicy::default();
        let writer = writer(&store, &policy, &progress);

        assert_eq!(writer.drop_index().await, IndexOutcome::Unchanged);
        assert_eq!(writer.create_index().await, IndexOutcome::Applied);
        assert_eq!(writer.create_index().await, IndexOutcome::Unchanged);
        assert_eq!(writer.drop_index().await, IndexOutcome::Applied);

        let broken = MemoryGraphStore::with_fault(|statement| match statement {
            Statement::CreateIndex { .. } => Some(StoreError::Query("out of memory".to_string())),
            _ => None,
        });
        let outcome = BatchWriter::new(&broken, "Resource", &policy, &progress, 10).create_index().await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_index_steps_follow_strategy() {
        let store = MemoryGraphStore::new();
        let progress = ProgressPolicy::default();

        let keep = BatchingPolicy { index_strategy: IndexStrategy::KeepOnline, ..Default::default() };
        let writer = writer(&store, &keep, &progress);
        assert_eq!(writer.prepare_index().await, IndexOutcome::Applied);
        assert!(writer.index_after_nodes().await.is_none());
        assert!(writer.index_after_edges().await.is_none());
        assert!(store.has_index("Resource", "uri"));

        let rebuild =
            BatchingPolicy { index_strategy: IndexStrategy::RebuildBeforeEdges, ..Default::default() };
        let writer = BatchWriter::new(&store, "Resource", &rebuild, &progress, 10);
        assert_eq!(writer.prepare_index().await, IndexOutcome::Applied);
        assert!(!store.has_index("Resource", "uri"));
        assert_eq!(writer.index_after_nodes().await, Some(IndexOutcome::Applied));
        assert!(writer.index_after_edges().await.is_none());
    }

    #[test]
    fn test_failure_log_is_capped() {
        let mut log = FailureLog::with_cap(2);
        for i in 0..5 {
            log.record(WriteFailure { target: format!("n{i}"), reason: "x".to_string() });
        }
        assert_eq!(log.omitted(), 3);
        let kept = log.into_vec();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].target, "n0");
    }
}
