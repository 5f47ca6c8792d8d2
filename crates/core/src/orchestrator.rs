//! Orchestration of one inventory resolution pass
//!
//! Fetches the schema and nodes of every requested kind, then the schemas and
//! nodes of the kinds their selected relationships point to, and finally
//! resolves every requested node. All fetches are issued one after the other.

use crate::config::NodeQuery;
use crate::node::{IdentityStore, Node};
use crate::resolver::Resolver;
use crate::schema::{NodeKind, SchemaStore};
use crate::selection::{related_kinds, select_fields};
use crate::source::{FetchError, FetchRequest, GraphSource};
use crate::value::{ResolvedNodes, ResolvedValue};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives schema and node fetches and resolves the requested kinds
pub struct Orchestrator<'a> {
    source: &'a dyn GraphSource,
}

impl<'a> Orchestrator<'a> {
    pub fn new(source: &'a dyn GraphSource) -> Self {
        Self { source }
    }

    /// Resolve every node of the requested kinds
    ///
    /// Returns `None` when nothing was requested or no node was found. Fetch
    /// failures are logged and shrink the result; they never abort the run.
    pub async fn resolve_all(
        &self,
        requested: &IndexMap<NodeKind, NodeQuery>,
    ) -> Option<ResolvedNodes> {
        if requested.is_empty() {
            debug!("No node kinds requested");
            return None;
        }

        let mut schemas = SchemaStore::new();
        let mut identities = IdentityStore::new();
        let mut selections: IndexMap<NodeKind, Vec<String>> = IndexMap::new();
        let mut top_level: Vec<(NodeKind, Arc<Node>)> = Vec::new();

        for (kind, query) in requested {
            info!("Fetching nodes for {kind}");
            self.load_schema(kind, &mut schemas).await;

            let nodes = match self.source.fetch_nodes(kind, &query.to_fetch_request()).await {
                Ok(nodes) => nodes,
                Err(e) => {
                    log_fetch_error(kind, &e);
                    continue;
                }
            };
            if nodes.is_empty() {
                debug!("No nodes found for {kind}");
                continue;
            }

            let selection = match query.include_override() {
                Some(include) => include.to_vec(),
                None => schemas
                    .get(kind.as_str())
                    .map(|schema| select_fields(schema, query.exclude.as_deref()))
                    .unwrap_or_default(),
            };
            debug!("Selected fields for {kind}: {selection:?}");
            selections.insert(kind.clone(), selection);
            top_level.extend(
                identities
                    .extend(nodes)
                    .into_iter()
                    .map(|node| (kind.clone(), node)),
            );
        }

        if top_level.is_empty() {
            info!("No nodes fetched");
            return None;
        }

        for (kind, selection) in &selections {
            let mut related_to_kind: Vec<NodeKind> = schemas
                .get(kind.as_str())
                .map(|schema| related_kinds(schema, selection).into_iter().collect())
                .unwrap_or_default();
            related_to_kind.sort();

            // Related nodes only populate the stores, they are not part of the output
            for related in related_to_kind {
                debug!("Fetching related kind {related} of {kind}");
                self.load_schema(&related, &mut schemas).await;
                match self
                    .source
                    .fetch_nodes(&related, &FetchRequest::default())
                    .await
                {
                    Ok(nodes) => {
                        identities.extend(nodes);
                    }
                    Err(e) => log_fetch_error(&related, &e),
                }
            }
        }

        let mut resolver = Resolver::new(self.source, &mut identities, &mut schemas);
        let mut resolved = ResolvedNodes::new();
        // Keyed by requested kind, nodes of a generic kind carry their concrete one
        for (kind, node) in &top_level {
            let Some(selection) = selections.get(kind) else {
                continue;
            };
            let mut attributes = resolver.resolve(node, selection).await;
            if attributes.is_empty() {
                debug!("{} resolved to no attributes", node.identity_key());
                continue;
            }
            attributes.insert(
                "id".to_string(),
                ResolvedValue::Scalar(Value::String(node.id.clone())),
            );
            resolved.insert(node.identity_key(), attributes);
        }

        info!("Resolved {} nodes", resolved.len());
        Some(resolved)
    }

    async fn load_schema(&self, kind: &NodeKind, schemas: &mut SchemaStore) {
        if schemas.is_resolved(kind.as_str()) {
            return;
        }
        match self.source.fetch_schema(kind).await {
            Ok(schema) => schemas.insert(schema),
            Err(e) => {
                log_fetch_error(kind, &e);
                schemas.mark_unresolved(kind.clone());
            }
        }
    }
}

fn log_fetch_error(kind: &NodeKind, error: &FetchError) {
    warn!("Skipping {kind}: {error}");
}
