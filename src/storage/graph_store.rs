//! Graph store interface: typed write statements and the capabilities a store offers.

use crate::core::RelationshipType;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// Property holding a node's full URI, the key edges are matched on.
pub const URI_ATTRIBUTE: &str = "uri";
/// Property holding a node's display label.
pub const NAME_ATTRIBUTE: &str = "name";

/// How quote characters inside a string value are made safe for the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quoting {
    /// Quotes are escaped and stored verbatim.
    Escape,
    /// Quotes are removed from the stored value.
    Strip,
}

/// A string value together with its quoting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quoted<'a> {
    pub value: &'a str,
    pub quoting: Quoting,
}

impl<'a> Quoted<'a> {
    pub fn new(value: &'a str, quoting: Quoting) -> Self {
        Self { value, quoting }
    }

    /// The value as it ends up stored in the graph.
    pub fn stored_value(&self) -> Cow<'a, str> {
        match self.quoting {
            Quoting::Strip if self.value.contains('\'') => Cow::Owned(self.value.replace('\'', "")),
            _ => Cow::Borrowed(self.value),
        }
    }
}

/// Whether a value would be changed by stripping quotes.
pub fn contains_quote(value: &str) -> bool {
    value.contains('\'')
}

/// One write operation against a named graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement<'a> {
    /// Delete every node and relationship in the graph.
    ClearGraph,
    /// Create a lookup index on `label.attribute`.
    CreateIndex { label: &'a str, attribute: &'a str },
    /// Drop the lookup index on `label.attribute`.
    DropIndex { label: &'a str, attribute: &'a str },
    /// Create one node carrying its uri and display name.
    CreateNode { label: &'a str, uri: Quoted<'a>, name: Quoted<'a> },
    /// Match both endpoints by uri and create one relationship between them.
    CreateEdge {
        label: &'a str,
        rel_type: &'a RelationshipType,
        source: Quoted<'a>,
        target: Quoted<'a>,
    },
}

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self { host: "localhost".to_string(), port: 6379, username: None, password: None }
    }
}

/// A selected graph accepting write statements, one call per statement.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
    async fn execute(&self, statement: &Statement<'_>) -> Result<(), StoreError>;
}

impl<S: GraphStore> GraphStore for Arc<S> {
    async fn execute(&self, statement: &Statement<'_>) -> Result<(), StoreError> {
        (**self).execute(statement).await
    }
}

/// Opens a connection and selects a graph by name.
#[allow(async_fn_in_trait)]
pub trait StoreConnector {
    type Store: GraphStore;

    async fn connect(&self, endpoint: &Endpoint, graph_name: &str) -> Result<Self::Store, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_value_by_quoting() {
        let escaped = Quoted::new("it's", Quoting::Escape);
        assert_eq!(escaped.stored_value(), "it's");

        let stripped = Quoted::new("it's", Quoting::Strip);
        assert_eq!(stripped.stored_value(), "its");

        let plain = Quoted::new("cat", Quoting::Strip);
        assert!(matches!(plain.stored_value(), Cow::Borrowed("cat")));
    }

    #[test]
    fn test_endpoint_hides_password() {
        let endpoint = Endpoint { password: Some("secret".to_string()), ..Default::default() };
        let json = serde_json::to_string(&endpoint).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("localhost"));
    }
}
