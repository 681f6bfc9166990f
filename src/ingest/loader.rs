//! Load orchestration.
//!
//! One load runs a fixed sequence of phases:
//! connect, clear graph, disable index, parse, collect, write nodes,
//! write edges, rebuild index, summarize.
//! Only a missing file, a refused connection or an unparseable input abort it.

use crate::error::{Error, Result};
use crate::ingest::batch_writer::{
    BatchWriter, BatchingPolicy, IndexOutcome, ProgressPolicy, TypeReport, WriteFailure,
};
use crate::ingest::collector::TripleCollector;
use crate::parsing::{parse_with_fallback, SourceFormat};
use crate::storage::{Endpoint, GraphStore, Statement, StoreConnector};
use log::{error, info, warn};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Number of relationship types listed in the summary.
const SUMMARY_TOP_TYPES: usize = 10;

/// Everything a [`Loader`] needs besides the request itself.
#[derive(Debug, Clone, Serialize)]
pub struct LoaderConfig {
    pub endpoint: Endpoint,
    pub policy: BatchingPolicy,
    pub progress: ProgressPolicy,
    /// Label put on every node and used by the uri index.
    pub node_label: String,
    /// Cap on failures kept in the statistics. Counts are never capped.
    pub max_recorded_failures: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            policy: BatchingPolicy::default(),
            progress: ProgressPolicy::default(),
            node_label: "Resource".to_string(),
            max_recorded_failures: 1000,
        }
    }
}

impl LoaderConfig {
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.node_label.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(Error::Config(format!("invalid node label '{}'", self.node_label)));
        }
        if self.policy.node_batch_size == 0 || self.policy.edge_batch_size == 0 {
            return Err(Error::Config("batch sizes must be at least 1".to_string()));
        }
        if self.policy.edge_concurrency == 0 {
            return Err(Error::Config("edge concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// One file to load.
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    pub path: PathBuf,
    /// Defaults to the file stem.
    pub graph_name: Option<String>,
    /// Defaults to detection from the file extension.
    pub format: Option<SourceFormat>,
    /// Load only the first `n` triples.
    pub sample_size: Option<usize>,
}

impl LoadRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    pub fn graph_name(&self) -> String {
        self.graph_name.clone().unwrap_or_else(|| default_graph_name(&self.path))
    }
}

fn default_graph_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "graph".to_string())
}

/// Seconds spent per phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseTimings {
    pub parse_secs: f64,
    pub collect_secs: f64,
    pub node_write_secs: f64,
    pub edge_write_secs: f64,
    pub total_secs: f64,
}

/// What one load did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadStatistics {
    pub file: PathBuf,
    pub graph_name: String,
    pub format: Option<SourceFormat>,
    pub total_triples_in_file: usize,
    pub triples_loaded: usize,
    pub nodes_created: usize,
    pub nodes_failed: usize,
    pub edges_created: usize,
    pub edges_failed: usize,
    /// Per relationship type, in first-seen order.
    pub relationship_types: Vec<TypeReport>,
    pub index_failures: usize,
    pub clear_failed: bool,
    /// At most `max_recorded_failures` node failures followed by edge failures.
    pub failures: Vec<WriteFailure>,
    pub failures_omitted: usize,
    pub timings: PhaseTimings,
    pub triples_per_sec: f64,
}

impl LoadStatistics {
    /// The `n` relationship types with most triples, ties by name.
    pub fn top_types(&self, n: usize) -> Vec<&TypeReport> {
        let mut types: Vec<&TypeReport> = self.relationship_types.iter().collect();
        types.sort_by(|a, b| b.triples.cmp(&a.triples).then_with(|| a.rel_type.cmp(&b.rel_type)));
        types.truncate(n);
        types
    }

    fn log_summary(&self) {
        info!("Load summary for '{}' into graph '{}'", self.file.display(), self.graph_name);
        if let Some(format) = self.format {
            info!("  Format: {}", format);
        }
        info!("  Triples: {} loaded of {} in file", self.triples_loaded, self.total_triples_in_file);
        info!("  Nodes: {} created, {} failed", self.nodes_created, self.nodes_failed);
        info!(
            "  Edges: {} created, {} failed across {} relationship types",
            self.edges_created,
            self.edges_failed,
            self.relationship_types.len()
        );
        for report in self.top_types(SUMMARY_TOP_TYPES) {
            info!(
                "    {}: {} ({} created, {} failed)",
                report.rel_type, report.triples, report.created, report.failed
            );
        }
        if self.index_failures > 0 {
            warn!("  Index operations failed: {}", self.index_failures);
        }
        if self.clear_failed {
            warn!("  Graph was not cleared before loading");
        }
        let t = &self.timings;
        info!(
            "  Time: {:.2}s total (parse {:.2}s, collect {:.2}s, nodes {:.2}s, edges {:.2}s), {:.0} triples/sec",
            t.total_secs, t.parse_secs, t.collect_secs, t.node_write_secs, t.edge_write_secs, self.triples_per_sec
        );
    }
}

/// Outcome of a load as handed to callers: the statistics or an error record.
#[derive(Debug)]
pub enum LoadReport {
    Loaded(Box<LoadStatistics>),
    Failed(Error),
}

impl LoadReport {
    pub fn is_error(&self) -> bool {
        matches!(self, LoadReport::Failed(_))
    }
}

impl From<Result<LoadStatistics>> for LoadReport {
    fn from(result: Result<LoadStatistics>) -> Self {
        match result {
            Ok(stats) => LoadReport::Loaded(Box::new(stats)),
            Err(err) => LoadReport::Failed(err),
        }
    }
}

#[derive(Serialize)]
struct ErrorRecord {
    error: String,
}

impl Serialize for LoadReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LoadReport::Loaded(stats) => stats.serialize(serializer),
            LoadReport::Failed(err) => ErrorRecord { error: err.to_string() }.serialize(serializer),
        }
    }
}

fn count_failure(outcome: &IndexOutcome, failures: &mut usize) {
    if outcome.is_failure() {
        *failures += 1;
    }
}

/// Runs loads against whatever store `C` connects to.
pub struct Loader<C> {
    connector: C,
    config: LoaderConfig,
}

impl<C: StoreConnector> Loader<C> {
    pub fn new(connector: C, config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { connector, config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run one load to completion. Write failures are counted, not returned.
    pub async fn load(&self, request: &LoadRequest) -> Result<LoadStatistics> {
        let result = self.run(request).await;
        if let Err(err) = &result {
            error!("Load of '{}' failed: {}", request.path.display(), err);
        }
        result
    }

    async fn run(&self, request: &LoadRequest) -> Result<LoadStatistics> {
        let started = Instant::now();
        let path = request.path.as_path();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let graph_name = request.graph_name();
        let mut stats = LoadStatistics {
            file: path.to_path_buf(),
            graph_name: graph_name.clone(),
            ..Default::default()
        };

        let store = self
            .connector
            .connect(&self.config.endpoint, &graph_name)
            .await
            .map_err(Error::Connection)?;

        let writer = BatchWriter::new(
            &store,
            &self.config.node_label,
            &self.config.policy,
            &self.config.progress,
            self.config.max_recorded_failures,
        );

        info!("Clearing graph '{}'", graph_name);
        if let Err(err) = store.execute(&Statement::ClearGraph).await {
            warn!("Could not clear graph '{}': {}", graph_name, err);
            stats.clear_failed = true;
        }

        let prepared = writer.prepare_index().await;
        count_failure(&prepared, &mut stats.index_failures);

        let declared = request.format.unwrap_or_else(|| SourceFormat::detect(path));
        info!("Parsing '{}' (declared format: {})", path.display(), declared);
        let phase = Instant::now();
        let parsed = match parse_with_fallback(path, declared) {
            Ok(parsed) => parsed,
            Err(err) => {
                if self.config.policy.index_strategy.drops_index() {
                    warn!("Parsing failed, restoring index before giving up");
                    writer.create_index().await;
                }
                return Err(err.into());
            }
        };
        stats.timings.parse_secs = phase.elapsed().as_secs_f64();
        stats.format = Some(parsed.format);
        stats.total_triples_in_file = parsed.total();
        info!("Parsed {} triples as {}", parsed.total(), parsed.format);

        if let Some(sample) = request.sample_size {
            info!("Sampling the first {} of {} triples", sample.min(parsed.total()), parsed.total());
        }
        let phase = Instant::now();
        let collection = TripleCollector::new(self.config.progress.collect_interval)
            .collect(parsed.triples, request.sample_size);
        stats.timings.collect_secs = phase.elapsed().as_secs_f64();
        stats.triples_loaded = collection.triples_processed;
        info!(
            "Collected {} nodes and {} edges in {} relationship types",
            collection.nodes.len(),
            collection.edges.total_edges(),
            collection.edges.len()
        );
        for (rel_type, count) in collection.histogram.top(SUMMARY_TOP_TYPES) {
            info!("  {}: {}", rel_type, count);
        }

        let phase = Instant::now();
        let nodes = writer.write_nodes(&collection.nodes).await;
        stats.timings.node_write_secs = phase.elapsed().as_secs_f64();
        if let Some(outcome) = writer.index_after_nodes().await {
            count_failure(&outcome, &mut stats.index_failures);
        }

        let phase = Instant::now();
        let edges = writer.write_edges(&collection.nodes, &collection.edges, &nodes).await;
        stats.timings.edge_write_secs = phase.elapsed().as_secs_f64();
        if let Some(outcome) = writer.index_after_edges().await {
            count_failure(&outcome, &mut stats.index_failures);
        }

        stats.nodes_created = nodes.created;
        stats.nodes_failed = nodes.failed;
        stats.edges_created = edges.created;
        stats.edges_failed = edges.failed;
        stats.relationship_types = edges.per_type;

        let mut failures = nodes.failures;
        failures.extend(edges.failures);
        stats.failures_omitted = failures.omitted();
        stats.failures = failures.into_vec();

        stats.timings.total_secs = started.elapsed().as_secs_f64();
        stats.triples_per_sec = if stats.timings.total_secs > 0.0 {
            stats.triples_loaded as f64 / stats.timings.total_secs
        } else {
            0.0
        };

        stats.log_summary();
        Ok(stats)
    }
}
