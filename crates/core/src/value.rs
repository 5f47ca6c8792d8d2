//! Flattened output of node resolution

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name to resolved value, in resolution order
pub type ResolvedAttributeMap = IndexMap<String, ResolvedValue>;

/// Resolved mappings keyed by node identity key
pub type ResolvedNodes = IndexMap<String, ResolvedAttributeMap>;

/// Value stored for one field of a resolved node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    /// Peer of a single-cardinality relationship
    One(ResolvedAttributeMap),
    /// Peers of a multi-cardinality relationship
    Many(Vec<ResolvedAttributeMap>),
    /// Attribute value, or `null` for an unset single relationship
    Scalar(Value),
}

impl ResolvedValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_one(&self) -> Option<&ResolvedAttributeMap> {
        match self {
            Self::One(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&[ResolvedAttributeMap]> {
        match self {
            Self::Many(maps) => Some(maps),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::One(map) => map_to_json(map),
            Self::Many(maps) => Value::Array(maps.iter().map(map_to_json).collect()),
        }
    }
}

/// Convert a resolved map to a plain JSON object
pub fn map_to_json(map: &ResolvedAttributeMap) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}

/// Whether a value counts as present for attribute normalization
///
/// `null`, `false`, zero, the empty string and empty collections are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Normalize an attribute value for inventory output
///
/// Truthy values are converted to their string form; falsy values are kept raw.
pub fn normalize_attribute(value: &Value) -> Value {
    if !is_truthy(value) {
        return value.clone();
    }
    match value {
        Value::String(s) => Value::String(s.clone()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => Value::String(other.to_string()),
    }
}
