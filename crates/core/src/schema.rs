//! Schema model for graph node kinds
//!
//! A [`SchemaDescriptor`] describes the fields of one node kind. Every field is
//! classified once, when the descriptor is built, as either an attribute or a
//! relationship so that the resolver never has to probe names at access time.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a category of node in the remote graph (e.g. `InfraDevice`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKind(String);

impl NodeKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKind {
    fn from(kind: &str) -> Self {
        Self(kind.to_string())
    }
}

impl From<String> for NodeKind {
    fn from(kind: String) -> Self {
        Self(kind)
    }
}

impl Borrow<str> for NodeKind {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeKind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Number of peers a relationship yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Classification tag of a relationship, drives default inclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RelationshipKind {
    Attribute,
    Parent,
    Component,
    #[default]
    Generic,
    #[serde(other)]
    Other,
}

/// Attribute field of a node kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
    /// Value type reported by the server (e.g. `Text`, `Number`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }
}

/// Relationship field of a node kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSchema {
    pub name: String,
    pub peer: NodeKind,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub kind: RelationshipKind,
}

impl RelationshipSchema {
    pub fn new(
        name: impl Into<String>,
        peer: impl Into<NodeKind>,
        cardinality: Cardinality,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            name: name.into(),
            peer: peer.into(),
            cardinality,
            kind,
        }
    }

    /// Whether the default field selection requests this relationship
    ///
    /// Multi-valued relationships are only requested when they carry
    /// attribute-like or parent semantics.
    pub fn included_by_default(&self) -> bool {
        match self.cardinality {
            Cardinality::One => true,
            Cardinality::Many => matches!(
                self.kind,
                RelationshipKind::Attribute | RelationshipKind::Parent
            ),
        }
    }
}

/// Classified field of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDescriptor {
    Attribute(AttributeSchema),
    Relationship(RelationshipSchema),
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        match self {
            Self::Attribute(attr) => &attr.name,
            Self::Relationship(rel) => &rel.name,
        }
    }
}

/// Wire shape of a schema as returned by the REST schema endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    inherit_from: Vec<NodeKind>,
    #[serde(default)]
    attributes: Vec<AttributeSchema>,
    #[serde(default)]
    relationships: Vec<RelationshipSchema>,
}

/// Description of the fields of one node kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema", into = "RawSchema")]
pub struct SchemaDescriptor {
    kind: NodeKind,
    inherit_from: Vec<NodeKind>,
    fields: IndexMap<String, FieldDescriptor>,
}

impl SchemaDescriptor {
    /// Build a descriptor, rejecting names declared more than once
    pub fn new(
        kind: impl Into<NodeKind>,
        attributes: Vec<AttributeSchema>,
        relationships: Vec<RelationshipSchema>,
    ) -> Result<Self> {
        let kind = kind.into();
        let mut fields = IndexMap::with_capacity(attributes.len() + relationships.len());

        let declared = attributes
            .into_iter()
            .map(FieldDescriptor::Attribute)
            .chain(relationships.into_iter().map(FieldDescriptor::Relationship));
        for field in declared {
            let name = field.name().to_string();
            if fields.insert(name.clone(), field).is_some() {
                return Err(Error::schema_validation(format!(
                    "field '{name}' is declared more than once on {kind}"
                )));
            }
        }

        Ok(Self {
            kind,
            inherit_from: Vec::new(),
            fields,
        })
    }

    /// Declare generic kinds this kind inherits from
    pub fn with_inherit_from(mut self, generics: Vec<NodeKind>) -> Self {
        self.inherit_from = generics;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inherit_from(&self) -> &[NodeKind] {
        &self.inherit_from
    }

    /// Whether nodes of this kind are also nodes of `kind`
    pub fn is_a(&self, kind: &str) -> bool {
        self.kind.as_str() == kind || self.inherit_from.iter().any(|g| g.as_str() == kind)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.fields.values().filter_map(|field| match field {
            FieldDescriptor::Attribute(attr) => Some(attr),
            FieldDescriptor::Relationship(_) => None,
        })
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipSchema> {
        self.fields.values().filter_map(|field| match field {
            FieldDescriptor::Relationship(rel) => Some(rel),
            FieldDescriptor::Attribute(_) => None,
        })
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipSchema> {
        match self.fields.get(name) {
            Some(FieldDescriptor::Relationship(rel)) => Some(rel),
            _ => None,
        }
    }

    /// Attribute names in declaration order
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes().map(|attr| attr.name.clone()).collect()
    }

    pub fn relationship_names(&self) -> Vec<String> {
        self.relationships().map(|rel| rel.name.clone()).collect()
    }
}

impl TryFrom<RawSchema> for SchemaDescriptor {
    type Error = Error;

    fn try_from(raw: RawSchema) -> Result<Self> {
        let kind = match (raw.kind, raw.namespace, raw.name) {
            (Some(kind), _, _) => kind,
            (None, Some(namespace), Some(name)) => format!("{namespace}{name}"),
            _ => {
                return Err(Error::schema_validation(
                    "schema has neither a kind nor a namespace and name",
                ))
            }
        };
        Ok(Self::new(kind, raw.attributes, raw.relationships)?.with_inherit_from(raw.inherit_from))
    }
}

impl From<SchemaDescriptor> for RawSchema {
    fn from(schema: SchemaDescriptor) -> Self {
        let mut attributes = Vec::new();
        let mut relationships = Vec::new();
        for field in schema.fields.into_values() {
            match field {
                FieldDescriptor::Attribute(attr) => attributes.push(attr),
                FieldDescriptor::Relationship(rel) => relationships.push(rel),
            }
        }
        Self {
            kind: Some(schema.kind.0),
            namespace: None,
            name: None,
            inherit_from: schema.inherit_from,
            attributes,
            relationships,
        }
    }
}

/// Schemas known during one resolution pass
///
/// A kind mapped to `None` was looked up but could not be resolved.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    schemas: HashMap<NodeKind, Option<SchemaDescriptor>>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: SchemaDescriptor) {
        self.schemas.insert(schema.kind().clone(), Some(schema));
    }

    /// Record a kind whose schema could not be fetched
    pub fn mark_unresolved(&mut self, kind: NodeKind) {
        self.schemas.entry(kind).or_insert(None);
    }

    /// Whether the kind has been looked up at all
    pub fn contains(&self, kind: &str) -> bool {
        self.schemas.contains_key(kind)
    }

    /// Whether the kind has a usable schema
    pub fn is_resolved(&self, kind: &str) -> bool {
        matches!(self.schemas.get(kind), Some(Some(_)))
    }

    pub fn get(&self, kind: &str) -> Option<&SchemaDescriptor> {
        self.schemas.get(kind).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
