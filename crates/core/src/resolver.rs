//! Recursive resolution of fetched nodes into flat attribute maps
//!
//! Attributes are normalized with [`normalize_attribute`]. Relationships are
//! dereferenced through the [`IdentityStore`]; every peer is resolved using its
//! own attribute names rather than the caller's selection. Peers whose kind has
//! no usable schema yet (typically peers of a generic kind) are fetched on
//! demand through [`GraphSource::fetch_peers`].

use crate::node::{IdentityStore, Node, NodeRef, RelationshipValue};
use crate::schema::{Cardinality, FieldDescriptor, NodeKind, RelationshipSchema, SchemaStore};
use crate::source::{FetchError, GraphSource};
use crate::value::{normalize_attribute, ResolvedAttributeMap, ResolvedValue};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Limit on nested relationship resolution
///
/// Peers are resolved with their attribute names only, so the resolution
/// entry points never nest deeper than one level. The limit and the cycle
/// guard bound recursion for callers passing their own field lists.
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// A node and field list currently being resolved
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathEntry {
    node_id: String,
    signature: String,
}

/// Resolves nodes against the stores of one orchestration run
pub struct Resolver<'a> {
    source: &'a dyn GraphSource,
    identities: &'a mut IdentityStore,
    schemas: &'a mut SchemaStore,
    max_depth: usize,
    dereferenced: HashSet<(String, String)>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        source: &'a dyn GraphSource,
        identities: &'a mut IdentityStore,
        schemas: &'a mut SchemaStore,
    ) -> Self {
        Self {
            source,
            identities,
            schemas,
            max_depth: DEFAULT_MAX_DEPTH,
            dereferenced: HashSet::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve `fields` of `node` into an attribute map
    ///
    /// Fields unknown to the node's schema, or missing from the node, are
    /// skipped. Resolution never fails; unreachable peers shrink the result.
    pub async fn resolve(&mut self, node: &Node, fields: &[String]) -> ResolvedAttributeMap {
        let mut path = Vec::new();
        self.resolve_at(node, fields, &mut path)
            .await
            .unwrap_or_default()
    }

    fn resolve_at<'s>(
        &'s mut self,
        node: &'s Node,
        fields: &'s [String],
        path: &'s mut Vec<PathEntry>,
    ) -> BoxFuture<'s, Option<ResolvedAttributeMap>> {
        Box::pin(async move {
            let entry = PathEntry {
                node_id: node.id.clone(),
                signature: fields.join(","),
            };
            if path.contains(&entry) {
                warn!(
                    "Cycle detected while resolving {}, truncating",
                    node.identity_key()
                );
                return None;
            }
            if path.len() > self.max_depth {
                warn!(
                    "Maximum resolution depth {} reached at {}, truncating",
                    self.max_depth,
                    node.identity_key()
                );
                return None;
            }

            path.push(entry);
            let resolved = self.resolve_fields(node, fields, path).await;
            path.pop();
            Some(resolved)
        })
    }

    async fn resolve_fields(
        &mut self,
        node: &Node,
        fields: &[String],
        path: &mut Vec<PathEntry>,
    ) -> ResolvedAttributeMap {
        let mut resolved = ResolvedAttributeMap::new();
        // Nodes fetched through a generic kind carry a concrete kind not seen yet
        self.ensure_schema(&node.kind).await;

        for name in fields {
            let Some(field) = self
                .schemas
                .get(node.kind.as_str())
                .and_then(|schema| schema.field(name))
                .cloned()
            else {
                debug!("{} has no field '{name}', skipping", node.kind);
                continue;
            };

            match field {
                FieldDescriptor::Attribute(attr) => match node.attribute(name) {
                    Some(value) => {
                        let value = normalize_attribute(value);
                        resolved.insert(attr.name, ResolvedValue::Scalar(value));
                    }
                    None => debug!("{} has no value for '{name}', skipping", node.identity_key()),
                },
                FieldDescriptor::Relationship(rel) => {
                    let Some(value) = node.relationship(name) else {
                        debug!("{} has no value for '{name}', skipping", node.identity_key());
                        continue;
                    };
                    if let Some(value) = self.resolve_relationship(node, &rel, value, path).await {
                        resolved.insert(rel.name, value);
                    }
                }
            }
        }

        resolved
    }

    async fn resolve_relationship(
        &mut self,
        node: &Node,
        rel: &RelationshipSchema,
        value: &RelationshipValue,
        path: &mut Vec<PathEntry>,
    ) -> Option<ResolvedValue> {
        let peers = value.peers();
        if self.needs_dereference(rel, &peers) {
            self.dereference(node, rel).await;
        }
        for peer in &peers {
            if let Some(kind) = self.peer_kind(peer) {
                self.ensure_schema(&kind).await;
            }
        }

        match rel.cardinality {
            Cardinality::Many => {
                let mut maps = Vec::with_capacity(peers.len());
                for peer in peers {
                    let Some((peer, attrs)) = self.peer_with_attributes(peer) else {
                        debug!("Peer {} of '{}' has no resolvable schema", peer.id, rel.name);
                        continue;
                    };
                    if let Some(map) = self.resolve_at(&peer, &attrs, path).await {
                        maps.push(map);
                    }
                }
                Some(ResolvedValue::Many(maps))
            }
            Cardinality::One => {
                let Some((peer, attrs)) = peers
                    .first()
                    .and_then(|peer| self.peer_with_attributes(peer))
                else {
                    return Some(ResolvedValue::Scalar(Value::Null));
                };
                self.resolve_at(&peer, &attrs, path)
                    .await
                    .map(ResolvedValue::One)
            }
        }
    }

    /// Whether the relationship's peers must be fetched before they can be resolved
    fn needs_dereference(&self, rel: &RelationshipSchema, peers: &[&NodeRef]) -> bool {
        !self.schemas.is_resolved(rel.peer.as_str())
            || peers.iter().any(|peer| !self.identities.contains(&peer.id))
    }

    async fn dereference(&mut self, node: &Node, rel: &RelationshipSchema) {
        if !self
            .dereferenced
            .insert((node.id.clone(), rel.name.clone()))
        {
            return;
        }

        debug!("Fetching peers of {}.{} on demand", node.identity_key(), rel.name);
        match self.source.fetch_peers(node, rel).await {
            Ok(peers) => {
                let kinds: Vec<NodeKind> = peers.iter().map(|peer| peer.kind.clone()).collect();
                self.identities.extend(peers);
                for kind in kinds {
                    self.ensure_schema(&kind).await;
                }
            }
            Err(e) => warn!(
                "Failed to fetch peers of {}.{}: {e}",
                node.identity_key(),
                rel.name
            ),
        }
    }

    /// Fetch a kind's schema unless it was already looked up
    async fn ensure_schema(&mut self, kind: &NodeKind) {
        if self.schemas.contains(kind.as_str()) {
            return;
        }
        match self.source.fetch_schema(kind).await {
            Ok(schema) => self.schemas.insert(schema),
            Err(e) => {
                match &e {
                    FetchError::SchemaNotFound(_) => debug!("{e}"),
                    _ => warn!("Failed to fetch schema for {kind}: {e}"),
                }
                self.schemas.mark_unresolved(kind.clone());
            }
        }
    }

    fn peer_kind(&self, peer: &NodeRef) -> Option<NodeKind> {
        self.identities
            .get(&peer.id)
            .map(|node| node.kind.clone())
            .or_else(|| peer.kind.clone())
    }

    fn peer_with_attributes(&self, peer: &NodeRef) -> Option<(Arc<Node>, Vec<String>)> {
        let node = self.identities.get(&peer.id)?;
        let attrs = self.schemas.get(node.kind.as_str())?.attribute_names();
        Some((node, attrs))
    }
}
