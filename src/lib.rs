//! # Lexigraph
//!
//! Lexigraph bulk-loads RDF triple sets, such as lexical knowledge graphs like
//! WordNet, into a property-graph store as labeled nodes and typed relationships.
//!
//! ## Features
//!
//! - Parsing of Turtle, N3, N-Triples, RDF/XML, JSON-LD, N-Quads and TriG with format fallback
//! - Node deduplication by URI and relationship types derived from predicate local names
//! - Batched writes with index bracketing and best-effort failure handling
//! - FalkorDB and in-memory graph stores
//!
//! ## Example
//!
//! ```rust,no_run
//! use lexigraph::ingest::{LoadRequest, Loader, LoaderConfig};
//! use lexigraph::storage::FalkorConnector;
//!
//! async fn example() -> lexigraph::Result<()> {
//!     let loader = Loader::new(FalkorConnector, LoaderConfig::default())?;
//!     let stats = loader.load(&LoadRequest::new("data/english-wordnet.ttl")).await?;
//!     println!("{} nodes, {} edges", stats.nodes_created, stats.edges_created);
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::struct_excessive_bools)]

/// Core data structures and identifier sanitization
pub mod core;

/// Error types and result definitions
pub mod error;

/// Module for reading RDF triple sources
pub mod parsing;

/// Graph store interfaces and implementations
pub mod storage;

/// Collection, batched writes and load orchestration
pub mod ingest;

// Re-export commonly used types
pub use error::{Error, Result};

