//! RDF triple sources

pub mod rdf_parser;

pub use rdf_parser::{parse_file, parse_reader, parse_with_fallback, ParsedTriples, SourceFormat};
