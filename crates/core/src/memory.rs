//! In-memory graph source backed by a snapshot of schemas and nodes

use crate::error::{Result, ResultExt};
use crate::node::Node;
use crate::schema::{FieldDescriptor, NodeKind, RelationshipSchema, SchemaDescriptor};
use crate::source::{FetchError, FetchRequest, GraphSource};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Serialized form of a graph: every schema and every node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub schemas: Vec<SchemaDescriptor>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// [`GraphSource`] serving a fixed snapshot
///
/// Supported filters: `ids`, `<attribute>__value`, `<relationship>__ids` and
/// `<relationship>__<attribute>__value`.
#[derive(Debug, Default)]
pub struct MemorySource {
    schemas: IndexMap<NodeKind, SchemaDescriptor>,
    nodes: IndexMap<String, Node>,
    calls: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new(schemas: Vec<SchemaDescriptor>, nodes: Vec<Node>) -> Self {
        Self {
            schemas: schemas
                .into_iter()
                .map(|schema| (schema.kind().clone(), schema))
                .collect(),
            nodes: nodes.into_iter().map(|node| (node.id.clone(), node)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::new(snapshot.schemas, snapshot.nodes)
    }

    /// Load a JSON snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        debug!(
            "Loaded snapshot with {} schemas and {} nodes",
            snapshot.schemas.len(),
            snapshot.nodes.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Calls served so far, as `schema:<kind>`, `nodes:<kind>` or `peers:<id>.<rel>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn schema_of(&self, node: &Node) -> Option<&SchemaDescriptor> {
        self.schemas.get(node.kind.as_str())
    }

    fn is_known_kind(&self, kind: &str) -> bool {
        self.schemas.values().any(|schema| schema.is_a(kind))
    }

    fn is_of_kind(&self, node: &Node, kind: &str) -> bool {
        node.kind.as_str() == kind || self.schema_of(node).is_some_and(|schema| schema.is_a(kind))
    }

    fn matches(&self, node: &Node, filter: &Filter<'_>) -> bool {
        match filter {
            Filter::Ids(ids) => ids.iter().any(|id| values_match(id, &Value::String(node.id.clone()))),
            Filter::Attribute { name, value } => node
                .attribute(name)
                .is_some_and(|actual| values_match(value, actual)),
            Filter::PeerIds { relationship, ids } => node
                .relationship(relationship)
                .is_some_and(|rel| {
                    rel.peers().iter().any(|peer| {
                        ids.iter()
                            .any(|id| values_match(id, &Value::String(peer.id.clone())))
                    })
                }),
            Filter::PeerAttribute {
                relationship,
                name,
                value,
            } => node.relationship(relationship).is_some_and(|rel| {
                rel.peers().iter().any(|peer| {
                    self.nodes
                        .get(&peer.id)
                        .and_then(|peer| peer.attribute(name))
                        .is_some_and(|actual| values_match(value, actual))
                })
            }),
        }
    }
}

/// Parsed filter expression
enum Filter<'a> {
    Ids(Vec<Value>),
    Attribute {
        name: &'a str,
        value: &'a Value,
    },
    PeerIds {
        relationship: &'a str,
        ids: Vec<Value>,
    },
    PeerAttribute {
        relationship: &'a str,
        name: &'a str,
        value: &'a Value,
    },
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Filter values compare equal when their JSON or string forms agree
fn values_match(expected: &Value, actual: &Value) -> bool {
    if expected == actual {
        return true;
    }
    let as_text = |value: &Value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    as_text(expected) == as_text(actual)
}

fn parse_filter<'a>(
    schema: Option<&SchemaDescriptor>,
    key: &'a str,
    value: &'a Value,
) -> Option<Filter<'a>> {
    let is_attribute = |name: &str| {
        schema.map_or(true, |s| matches!(s.field(name), Some(FieldDescriptor::Attribute(_))))
    };
    let is_relationship = |name: &str| schema.map_or(true, |s| s.relationship(name).is_some());

    let parts: Vec<&str> = key.split("__").collect();
    match parts[..] {
        ["ids"] => Some(Filter::Ids(as_list(value))),
        [name, "value"] if is_attribute(name) => Some(Filter::Attribute { name, value }),
        [relationship, "ids"] if is_relationship(relationship) => Some(Filter::PeerIds {
            relationship,
            ids: as_list(value),
        }),
        [relationship, name, "value"] if is_relationship(relationship) => {
            Some(Filter::PeerAttribute {
                relationship,
                name,
                value,
            })
        }
        _ => None,
    }
}

#[async_trait]
impl GraphSource for MemorySource {
    async fn fetch_schema(&self, kind: &NodeKind) -> std::result::Result<SchemaDescriptor, FetchError> {
        self.record(format!("schema:{kind}"));
        self.schemas
            .get(kind.as_str())
            .cloned()
            .ok_or_else(|| FetchError::SchemaNotFound(kind.clone()))
    }

    async fn fetch_nodes(
        &self,
        kind: &NodeKind,
        request: &FetchRequest,
    ) -> std::result::Result<Vec<Node>, FetchError> {
        self.record(format!("nodes:{kind}"));
        if !self.is_known_kind(kind.as_str()) {
            return Err(FetchError::SchemaNotFound(kind.clone()));
        }

        let schema = self.schemas.get(kind.as_str());
        let mut filters = Vec::with_capacity(request.filters.len());
        for (key, value) in &request.filters {
            let filter = parse_filter(schema, key, value).ok_or_else(|| FetchError::FilterNotFound {
                kind: kind.clone(),
                filters: key.clone(),
            })?;
            filters.push(filter);
        }

        Ok(self
            .nodes
            .values()
            .filter(|node| self.is_of_kind(node, kind.as_str()))
            .filter(|node| filters.iter().all(|filter| self.matches(node, filter)))
            .map(|node| project(node, request))
            .collect())
    }

    async fn fetch_peers(
        &self,
        node: &Node,
        relationship: &RelationshipSchema,
    ) -> std::result::Result<Vec<Node>, FetchError> {
        self.record(format!("peers:{}.{}", node.id, relationship.name));
        let Some(stored) = self.nodes.get(&node.id) else {
            return Ok(Vec::new());
        };
        Ok(stored
            .relationship(&relationship.name)
            .map(|rel| {
                rel.peers()
                    .iter()
                    .filter_map(|peer| self.nodes.get(&peer.id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Keep only the fields a request asked for
fn project(node: &Node, request: &FetchRequest) -> Node {
    let keep = |name: &str| match (&request.include, &request.exclude) {
        (Some(include), _) if !include.is_empty() => include.iter().any(|i| i == name),
        (_, Some(exclude)) => !exclude.iter().any(|e| e == name),
        _ => true,
    };

    let mut projected = node.clone();
    projected.attributes.retain(|name, _| keep(name));
    projected.relationships.retain(|name, _| keep(name));
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeRef;
    use crate::schema::{AttributeSchema, Cardinality, RelationshipKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn source() -> MemorySource {
        let device = SchemaDescriptor::new(
            "InfraDevice",
            vec![AttributeSchema::new("name"), AttributeSchema::new("role")],
            vec![RelationshipSchema::new(
                "site",
                "LocationSite",
                Cardinality::One,
                RelationshipKind::Attribute,
            )],
        )
        .unwrap()
        .with_inherit_from(vec![NodeKind::from("CoreArtifactTarget")]);
        let site = SchemaDescriptor::new("LocationSite", vec![AttributeSchema::new("name")], vec![])
            .unwrap();

        MemorySource::new(
            vec![device, site],
            vec![
                Node::new("s1", "LocationSite").with_attribute("name", "atl1"),
                Node::new("s2", "LocationSite").with_attribute("name", "den1"),
                Node::new("d1", "InfraDevice")
                    .with_attribute("name", "atl1-edge1")
                    .with_attribute("role", "edge")
                    .with_one("site", Some(NodeRef::new("s1"))),
                Node::new("d2", "InfraDevice")
                    .with_attribute("name", "den1-core1")
                    .with_attribute("role", "core")
                    .with_one("site", Some(NodeRef::new("s2"))),
            ],
        )
    }

    fn filters(pairs: &[(&str, Value)]) -> FetchRequest {
        FetchRequest {
            filters: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..FetchRequest::default()
        }
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fetch_nodes_by_kind_and_generic() {
        let source = source();
        let kind = NodeKind::from("InfraDevice");
        let nodes = source.fetch_nodes(&kind, &FetchRequest::default()).await.unwrap();
        assert_eq!(ids(&nodes), vec!["d1", "d2"]);

        let generic = NodeKind::from("CoreArtifactTarget");
        let nodes = source.fetch_nodes(&generic, &FetchRequest::default()).await.unwrap();
        assert_eq!(ids(&nodes), vec!["d1", "d2"]);
    }

    #[tokio::test]
    async fn test_fetch_nodes_with_filters() {
        let source = source();
        let kind = NodeKind::from("InfraDevice");

        let by_attr = filters(&[("role__value", json!("core"))]);
        assert_eq!(ids(&source.fetch_nodes(&kind, &by_attr).await.unwrap()), vec!["d2"]);

        let by_peer = filters(&[("site__name__value", json!("atl1"))]);
        assert_eq!(ids(&source.fetch_nodes(&kind, &by_peer).await.unwrap()), vec!["d1"]);

        let by_peer_ids = filters(&[("site__ids", json!(["s2"]))]);
        assert_eq!(ids(&source.fetch_nodes(&kind, &by_peer_ids).await.unwrap()), vec!["d2"]);

        let by_ids = filters(&[("ids", json!(["d1"]))]);
        assert_eq!(ids(&source.fetch_nodes(&kind, &by_ids).await.unwrap()), vec!["d1"]);
    }

    #[tokio::test]
    async fn test_unknown_filter_and_kind() {
        let source = source();

        let err = source
            .fetch_nodes(&NodeKind::from("InfraDevice"), &filters(&[("colour__value", json!("red"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::FilterNotFound { .. }));

        let err = source
            .fetch_nodes(&NodeKind::from("InfraCircuit"), &FetchRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::SchemaNotFound(NodeKind::from("InfraCircuit")));
    }

    #[tokio::test]
    async fn test_include_projects_fields() {
        let source = source();
        let request = FetchRequest {
            include: Some(vec!["name".to_string()]),
            ..FetchRequest::default()
        };
        let nodes = source
            .fetch_nodes(&NodeKind::from("InfraDevice"), &request)
            .await
            .unwrap();

        assert_eq!(nodes[0].attributes.len(), 1);
        assert!(nodes[0].relationships.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_peers_and_call_log() {
        let source = source();
        let device = Node::new("d1", "InfraDevice");
        let rel = RelationshipSchema::new("site", "LocationSite", Cardinality::One, RelationshipKind::Attribute);

        let peers = source.fetch_peers(&device, &rel).await.unwrap();
        assert_eq!(ids(&peers), vec!["s1"]);
        assert_eq!(source.calls(), vec!["peers:d1.site"]);
    }

    #[test]
    fn test_load_snapshot_file() {
        let snapshot = json!({
            "schemas": [{"kind": "LocationSite", "attributes": [{"name": "name"}]}],
            "nodes": [{"id": "s1", "kind": "LocationSite", "attributes": {"name": "atl1"}}]
        });
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), snapshot.to_string()).unwrap();

        let source = MemorySource::load(file.path()).unwrap();
        assert_eq!(source.schemas.len(), 1);
        assert_eq!(source.nodes.len(), 1);
    }
}
