//! Fetched node instances and the identity store that deduplicates them

use crate::schema::NodeKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Reference to a peer node held by a relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: String,
    /// Concrete kind of the peer, when the server reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
}

impl NodeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<NodeKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Current value of a relationship on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipValue {
    Many(Vec<NodeRef>),
    One(Option<NodeRef>),
}

impl RelationshipValue {
    /// Peer references in declaration order
    pub fn peers(&self) -> Vec<&NodeRef> {
        match self {
            Self::Many(peers) => peers.iter().collect(),
            Self::One(peer) => peer.iter().collect(),
        }
    }
}

/// One fetched entity of a given kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, Value>,
    #[serde(default)]
    pub relationships: IndexMap<String, RelationshipValue>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<NodeKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            display_label: None,
            attributes: IndexMap::new(),
            relationships: IndexMap::new(),
        }
    }

    pub fn with_display_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = Some(label.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_one(mut self, name: impl Into<String>, peer: Option<NodeRef>) -> Self {
        self.relationships
            .insert(name.into(), RelationshipValue::One(peer));
        self
    }

    pub fn with_many(mut self, name: impl Into<String>, peers: Vec<NodeRef>) -> Self {
        self.relationships
            .insert(name.into(), RelationshipValue::Many(peers));
        self
    }

    /// Stable key used for the node in resolved output
    ///
    /// The display label when the server provided one, `"<Kind> (<id>)"` otherwise.
    pub fn identity_key(&self) -> String {
        match &self.display_label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => format!("{} ({})", self.kind, self.id),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipValue> {
        self.relationships.get(name)
    }

    /// Reference to this node, as a peer would hold it
    pub fn as_ref_to(&self) -> NodeRef {
        NodeRef::new(&self.id).with_kind(self.kind.clone())
    }
}

/// Shared handles for every node fetched during one resolution pass
///
/// Inserting a node whose id is already known returns the handle stored first,
/// so a peer reachable from several nodes always resolves to the same instance.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    nodes: HashMap<String, Arc<Node>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> Arc<Node> {
        self.nodes
            .entry(node.id.clone())
            .or_insert_with(|| Arc::new(node))
            .clone()
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = Node>) -> Vec<Arc<Node>> {
        nodes.into_iter().map(|node| self.insert(node)).collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Node>> {
        self.nodes.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
