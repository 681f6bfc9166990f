use crate::core::{Term, Triple};
use crate::error::ParseError;
use log::{info, warn};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Term as OxTerm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

/// Serialization formats a triple source can be declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    Turtle,
    N3,
    NTriples,
    RdfXml,
    JsonLd,
    NQuads,
    TriG,
}

impl SourceFormat {
    /// Formats retried, in order, after the declared one fails.
    pub const FALLBACK_ORDER: [SourceFormat; 4] =
        [SourceFormat::RdfXml, SourceFormat::N3, SourceFormat::NTriples, SourceFormat::Turtle];

    pub fn from_token(token: &str) -> Option<SourceFormat> {
        match token.trim().to_lowercase().as_str() {
            "turtle" | "ttl" => Some(SourceFormat::Turtle),
            "n3" => Some(SourceFormat::N3),
            "nt" | "ntriples" | "n-triples" => Some(SourceFormat::NTriples),
            "xml" | "rdf" | "rdfxml" | "rdf/xml" => Some(SourceFormat::RdfXml),
            "json-ld" | "jsonld" | "json" => Some(SourceFormat::JsonLd),
            "nquads" | "nq" | "n-quads" => Some(SourceFormat::NQuads),
            "trig" => Some(SourceFormat::TriG),
            _ => None,
        }
    }

    /// Canonical token, as accepted on the command line.
    pub fn token(&self) -> &'static str {
        match self {
            SourceFormat::Turtle => "turtle",
            SourceFormat::N3 => "n3",
            SourceFormat::NTriples => "nt",
            SourceFormat::RdfXml => "xml",
            SourceFormat::JsonLd => "json-ld",
            SourceFormat::NQuads => "nquads",
            SourceFormat::TriG => "trig",
        }
    }

    /// Format implied by the file extension, `turtle` when unknown.
    pub fn detect(path: &Path) -> SourceFormat {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "ttl" => SourceFormat::Turtle,
            "n3" => SourceFormat::N3,
            "nt" => SourceFormat::NTriples,
            "xml" | "rdf" | "owl" => SourceFormat::RdfXml,
            "json" | "jsonld" => SourceFormat::JsonLd,
            "nq" => SourceFormat::NQuads,
            "trig" => SourceFormat::TriG,
            _ => SourceFormat::Turtle,
        }
    }

    fn parser_format(&self) -> Option<RdfFormat> {
        match self {
            SourceFormat::Turtle => Some(RdfFormat::Turtle),
            SourceFormat::N3 => Some(RdfFormat::N3),
            SourceFormat::NTriples => Some(RdfFormat::NTriples),
            SourceFormat::RdfXml => Some(RdfFormat::RdfXml),
            SourceFormat::NQuads => Some(RdfFormat::NQuads),
            SourceFormat::TriG => Some(RdfFormat::TriG),
            SourceFormat::JsonLd => RdfFormat::from_extension("jsonld"),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for SourceFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceFormat::from_token(s).ok_or_else(|| ParseError::UnsupportedFormat(s.to_string()))
    }
}

/// Fully materialized triple set plus the format that finally parsed it.
#[derive(Debug)]
pub struct ParsedTriples {
    pub format: SourceFormat,
    pub triples: Vec<Triple>,
}

impl ParsedTriples {
    pub fn total(&self) -> usize {
        self.triples.len()
    }
}

/// Parse RDF from any reader. Quad formats keep the triple and drop the graph name.
pub fn parse_reader<R: Read>(reader: R, format: SourceFormat) -> Result<Vec<Triple>, ParseError> {
    let parser_format = format
        .parser_format()
        .ok_or_else(|| ParseError::UnsupportedFormat(format.token().to_string()))?;

    let mut triples = Vec::new();
    for quad in RdfParser::from_format(parser_format).for_reader(reader) {
        let quad =
            quad.map_err(|e| ParseError::Syntax { format, message: e.to_string() })?;
        triples.push(Triple::new(
            convert_term(quad.subject.into()),
            quad.predicate.into_string(),
            convert_term(quad.object),
        ));
    }
    Ok(triples)
}

/// Parse a file in exactly one format.
pub fn parse_file(path: &Path, format: SourceFormat) -> Result<Vec<Triple>, ParseError> {
    if !path.exists() {
        return Err(ParseError::FileNotFound(path.to_path_buf()));
    }
    let file = File::open(path)
        .map_err(|source| ParseError::Io { path: path.to_path_buf(), source })?;
    parse_reader(BufReader::new(file), format)
}

/// Parse a file in the declared format, then in each fallback format until one succeeds.
pub fn parse_with_fallback(path: &Path, declared: SourceFormat) -> Result<ParsedTriples, ParseError> {
    let start = Instant::now();
    let candidates = std::iter::once(declared)
        .chain(SourceFormat::FALLBACK_ORDER.into_iter().filter(|f| *f != declared));

    let mut attempts = Vec::new();
    for format in candidates {
        if format != declared {
            info!("  Trying {} format...", format);
        }
        match parse_file(path, format) {
            Ok(triples) => {
                info!(
                    "Parsed {} triples as {} in {:.2}s",
                    triples.len(),
                    format,
                    start.elapsed().as_secs_f64()
                );
                return Ok(ParsedTriples { format, triples });
            }
            Err(e @ (ParseError::FileNotFound(_) | ParseError::Io { .. })) => return Err(e),
            Err(e) => {
                warn!("Parsing {} as {} failed: {}", path.display(), format, e);
                attempts.push(format!("{}: {}", format, e));
            }
        }
    }

    Err(ParseError::Exhausted { path: path.to_path_buf(), attempts })
}

fn convert_term(term: OxTerm) -> Term {
    match term {
        OxTerm::NamedNode(node) => Term::iri(node.into_string()),
        OxTerm::BlankNode(node) => Term::blank(node.as_str()),
        OxTerm::Literal(literal) => Term::literal(literal.value()),
        #[allow(unreachable_patterns)]
        other => Term::literal(other.to_string()),
    }
}
