//! Core data structures for the triple-to-property-graph transformation

use serde::{Deserialize, Serialize};

/// Dense dictionary id of a node, assigned in first-seen order.
/// u32 keeps an edge at 8 bytes, which matters at millions of triples.
pub type NodeId = u32;

/// What kind of RDF term a triple position holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermKind {
    Iri,
    BlankNode,
    Literal,
}

/// One position of a triple, reduced to its string form.
/// IRIs carry the bare IRI text, blank nodes `_:id`, literals their lexical value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    pub kind: TermKind,
    pub value: String,
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Self { kind: TermKind::Iri, value: value.into() }
    }

    pub fn blank(id: impl AsRef<str>) -> Self {
        Self { kind: TermKind::BlankNode, value: format!("_:{}", id.as_ref()) }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self { kind: TermKind::Literal, value: value.into() }
    }

    /// Display label used for the node's `name` property.
    pub fn display_label(&self) -> String {
        match self.kind {
            TermKind::Iri => display_label(&self.value),
            TermKind::BlankNode | TermKind::Literal => truncate_chars(&self.value, LABEL_MAX_CHARS),
        }
    }
}

/// An RDF statement as handed over by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self { subject, predicate: predicate.into(), object }
    }
}

/// A deduplicated node: the full URI (or literal string) and its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub uri: String,
    pub label: String,
}

/// Dictionary-encoded edge. The relationship type lives on the group that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

pub mod sanitize;
pub use sanitize::*;
