//! Error types for loading operations

use crate::parsing::SourceFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for load operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors: any of these aborts a load and becomes its error record.
#[derive(Error, Debug)]
pub enum Error {
    /// Input file does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The graph store could not be reached
    #[error("Connection failed: {0}")]
    Connection(#[source] StoreError),

    /// No format could parse the input
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while reading a triple source.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid {format} syntax: {message}")]
    Syntax { format: SourceFormat, message: String },

    #[error("could not parse {} with any format ({})", path.display(), attempts.join("; "))]
    Exhausted { path: PathBuf, attempts: Vec<String> },
}

/// Errors returned by a graph store for a single statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection refused, dropped or reset
    #[error("connection error: {0}")]
    Connection(String),

    /// The store rejected or failed to run the statement
    #[error("query failed: {0}")]
    Query(String),

    /// Index creation hit an existing index
    #[error("index already exists: {0}")]
    IndexExists(String),

    /// Index removal found no index
    #[error("index not found: {0}")]
    IndexMissing(String),

    /// An edge endpoint matched no node, so nothing was created
    #[error("no matching node: {0}")]
    NoMatch(String),
}
