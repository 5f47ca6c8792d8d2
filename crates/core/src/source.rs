//! Boundary between the resolution core and whatever serves the graph

use crate::node::Node;
use crate::schema::{NodeKind, RelationshipSchema, SchemaDescriptor};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failures a graph source reports to the core
///
/// None of these are fatal to an orchestration run: the affected kind or
/// relationship is skipped and a warning is logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Schema not found for {0}")]
    SchemaNotFound(NodeKind),

    #[error("Filters {filters} not found for {kind}")]
    FilterNotFound { kind: NodeKind, filters: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Server not reachable: {0}")]
    ServerUnreachable(String),

    #[error("Server not responsive: {0}")]
    ServerUnresponsive(String),
}

/// Field selection and filters sent along with a node fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub filters: IndexMap<String, Value>,
}

/// Schema lookup and node fetch capability consumed by the resolver
///
/// Implementations only return data; the caller places fetched nodes in its
/// [`IdentityStore`](crate::node::IdentityStore) and schemas in its
/// [`SchemaStore`](crate::schema::SchemaStore).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Fetch the schema of a kind
    async fn fetch_schema(&self, kind: &NodeKind) -> Result<SchemaDescriptor, FetchError>;

    /// Fetch every node of a kind matching the request filters
    async fn fetch_nodes(
        &self,
        kind: &NodeKind,
        request: &FetchRequest,
    ) -> Result<Vec<Node>, FetchError>;

    /// Fetch the peers of one relationship of a node
    ///
    /// Used when the peer kind is generic and the concrete peers only become
    /// known while walking the relationship.
    async fn fetch_peers(
        &self,
        node: &Node,
        relationship: &RelationshipSchema,
    ) -> Result<Vec<Node>, FetchError>;
}
