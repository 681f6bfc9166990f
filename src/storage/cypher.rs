//! Cypher rendering of write statements.
//!
//! All string escaping for the store's query protocol happens in [`escape_literal`].

use crate::storage::graph_store::{Quoted, Quoting, Statement, NAME_ATTRIBUTE, URI_ATTRIBUTE};
use std::borrow::Cow;

/// Make a value safe inside a single-quoted Cypher string literal.
pub fn escape_literal<'a>(quoted: &Quoted<'a>) -> Cow<'a, str> {
    let value = quoted.value;
    if !value.contains(&['\'', '\\'][..]) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match (c, quoted.quoting) {
            ('\\', _) => out.push_str("\\\\"),
            ('\'', Quoting::Escape) => out.push_str("\\'"),
            ('\'', Quoting::Strip) => {}
            (other, _) => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Render a statement as a single Cypher query.
pub fn render(statement: &Statement<'_>) -> String {
    match statement {
        Statement::ClearGraph => "MATCH (n) DETACH DELETE n".to_string(),
        Statement::CreateIndex { label, attribute } => {
            format!("CREATE INDEX ON :{}({})", label, attribute)
        }
        Statement::DropIndex { label, attribute } => {
            format!("DROP INDEX ON :{}({})", label, attribute)
        }
        Statement::CreateNode { label, uri, name } => format!(
            "CREATE (n:{} {{{}: '{}', {}: '{}'}})",
            label,
            URI_ATTRIBUTE,
            escape_literal(uri),
            NAME_ATTRIBUTE,
            escape_literal(name)
        ),
        Statement::CreateEdge { label, rel_type, source, target } => format!(
            "MATCH (s:{label} {{{key}: '{}'}}) MATCH (t:{label} {{{key}: '{}'}}) CREATE (s)-[:`{}`]->(t)",
            escape_literal(source),
            escape_literal(target),
            rel_type,
            label = label,
            key = URI_ATTRIBUTE,
        ),
    }
}
