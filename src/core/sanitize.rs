//! Identifier sanitization and label derivation.
//!
//! Everything here is a total function: malformed or empty input degrades to a
//! best-effort string and never fails.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::OnceLock;

/// Maximum length of a relationship type identifier.
pub const RELATIONSHIP_TYPE_MAX_LEN: usize = 50;
/// Maximum length of a node display label, in characters.
pub const LABEL_MAX_CHARS: usize = 100;
/// Prepended when an identifier would start with a digit.
pub const DIGIT_PREFIX: &str = "rel_";
/// Substituted when sanitization leaves nothing behind.
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "RELATED";

fn invalid_chars() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern"))
}

/// A relationship type identifier, always matching `^[A-Za-z0-9_]{1,50}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipType(String);

impl RelationshipType {
    /// Relationship type of a full predicate URI.
    pub fn from_predicate(predicate_uri: &str) -> Self {
        sanitize(local_name(predicate_uri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RelationshipType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RelationshipType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turn an arbitrary string into a relationship type identifier.
pub fn sanitize(raw: &str) -> RelationshipType {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            ' ' | '-' | '.' | ':' => '_',
            other => other,
        })
        .collect();

    let prefixed = match replaced.chars().next() {
        Some(first) if first.is_ascii_digit() => format!("{}{}", DIGIT_PREFIX, replaced),
        _ => replaced,
    };

    let mut cleaned = invalid_chars().replace_all(&prefixed, "").into_owned();
    if cleaned.is_empty() {
        cleaned = DEFAULT_RELATIONSHIP_TYPE.to_string();
    }
    // only ASCII is left, so byte truncation is char-safe
    cleaned.truncate(RELATIONSHIP_TYPE_MAX_LEN);

    RelationshipType(cleaned)
}

/// Local name of a URI: after the last `#` when one is present, otherwise after
/// the last `/`, otherwise the whole URI.
pub fn local_name(uri: &str) -> &str {
    for separator in ['#', '/'] {
        if let Some(idx) = uri.rfind(separator) {
            return &uri[idx + separator.len_utf8()..];
        }
    }
    uri
}

/// Display label of an IRI: its local name, truncated to 100 characters.
pub fn display_label(uri: &str) -> String {
    truncate_chars(local_name(uri), LABEL_MAX_CHARS)
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
