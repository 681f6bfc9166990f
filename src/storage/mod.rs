//! Graph store adapters and the statement protocol they speak

pub mod cypher;
pub mod falkordb_store;
pub mod graph_store;
pub mod memory_store;

pub use falkordb_store::{FalkorConnector, FalkorStore};
pub use graph_store::{
    contains_quote, Endpoint, GraphStore, Quoted, Quoting, Statement, StoreConnector,
    NAME_ATTRIBUTE, URI_ATTRIBUTE,
};
pub use memory_store::{MemoryConnector, MemoryGraphStore};
