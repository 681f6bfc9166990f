//! The load pipeline: triple collection, batched writes and the orchestrator
//! that sequences them.

pub mod batch_writer;
pub mod collector;
pub mod loader;

pub use batch_writer::{
    BatchWriter, BatchingPolicy, EdgeWriteReport, FailureLog, IndexOutcome, IndexStrategy,
    NodeState, NodeWriteReport, ProgressPolicy, TypeReport, WriteFailure,
};
pub use collector::{
    Collection, EdgeGroup, EdgeGroups, NodeTable, RelationshipHistogram, TripleCollector,
};
pub use loader::{LoadReport, LoadRequest, LoadStatistics, Loader, LoaderConfig, PhaseTimings};
