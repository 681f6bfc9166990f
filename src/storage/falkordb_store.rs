//! FalkorDB-backed graph store.
//!
//! Every statement is rendered to one Cypher query and sent through the async client.
//! Store error messages are classified so the writer can tell a missing or existing
//! index apart from a real failure.

use crate::error::StoreError;
use crate::storage::cypher;
use crate::storage::graph_store::{Endpoint, GraphStore, Statement, StoreConnector};
use falkordb::{FalkorAsyncClient, FalkorClientBuilder, FalkorConnectionInfo};
use log::{debug, info};

/// Connects to FalkorDB over its Redis protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct FalkorConnector;

/// A FalkorDB graph selected by name.
pub struct FalkorStore {
    client: FalkorAsyncClient,
    graph_name: String,
}

/// Connection URL in the `falkor://` scheme, credentials included when given.
pub fn connection_url(endpoint: &Endpoint) -> String {
    match (&endpoint.username, &endpoint.password) {
        (Some(user), Some(pass)) => {
            format!("falkor://{}:{}@{}:{}", user, pass, endpoint.host, endpoint.port)
        }
        (Some(user), None) => format!("falkor://{}@{}:{}", user, endpoint.host, endpoint.port),
        _ => format!("falkor://{}:{}", endpoint.host, endpoint.port),
    }
}

impl StoreConnector for FalkorConnector {
    type Store = FalkorStore;

    async fn connect(&self, endpoint: &Endpoint, graph_name: &str) -> Result<FalkorStore, StoreError> {
        info!("Connecting to FalkorDB at {}:{}", endpoint.host, endpoint.port);

        let connection_info: FalkorConnectionInfo = connection_url(endpoint)
            .try_into()
            .map_err(|e| StoreError::Connection(format!("invalid connection info: {:?}", e)))?;

        let client = FalkorClientBuilder::new_async()
            .with_connection_info(connection_info)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("{:?}", e)))?;

        info!("Connected to FalkorDB graph '{}'", graph_name);
        Ok(FalkorStore { client, graph_name: graph_name.to_string() })
    }
}

impl FalkorStore {
    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }
}

impl GraphStore for FalkorStore {
    async fn execute(&self, statement: &Statement<'_>) -> Result<(), StoreError> {
        let query = cypher::render(statement);
        let mut graph = self.client.select_graph(&self.graph_name);

        let result = graph
            .query(&query)
            .execute()
            .await
            .map_err(|e| classify_error(statement, &format!("{:?}", e)))?;

        if let Statement::CreateEdge { source, target, .. } = statement {
            if relationships_created(&result.stats) == 0 {
                debug!("Edge query matched nothing: {}", query);
                return Err(StoreError::NoMatch(format!(
                    "{} -> {}",
                    source.value, target.value
                )));
            }
        }
        Ok(())
    }
}

/// Map a FalkorDB error message to a [`StoreError`] for the statement that caused it.
pub fn classify_error(statement: &Statement<'_>, message: &str) -> StoreError {
    let lower = message.to_lowercase();

    if ["connection", "broken pipe", "reset", "refused"].iter().any(|m| lower.contains(m)) {
        return StoreError::Connection(message.to_string());
    }

    match statement {
        Statement::CreateIndex { .. }
            if ["already indexed", "already exists", "equivalent", "index exists"]
                .iter()
                .any(|m| lower.contains(m)) =>
        {
            StoreError::IndexExists(message.to_string())
        }
        Statement::DropIndex { .. }
            if ["unable to drop index", "no such index", "not found", "does not exist"]
                .iter()
                .any(|m| lower.contains(m)) =>
        {
            StoreError::IndexMissing(message.to_string())
        }
        _ => StoreError::Query(message.to_string()),
    }
}

/// Parse the "Relationships created: N" line out of FalkorDB query statistics.
pub fn relationships_created<S: AsRef<str>>(stats: &[S]) -> u64 {
    stats
        .iter()
        .filter_map(|line| {
            let (key, value) = line.as_ref().split_once(':')?;
            if key.trim().eq_ignore_ascii_case("relationships created") {
                value.trim().parse::<u64>().ok()
            } else {
                None
            }
        })
        .sum()
}
