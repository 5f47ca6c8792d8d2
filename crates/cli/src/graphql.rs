//! Shaping of raw GraphQL query results

use serde_json::{Map, Value};

/// Collapse Infrahub response wrappers
///
/// `{"value": x}` attribute objects become `x`, `{"edges": [{"node": n}]}`
/// becomes a list of nodes and `{"node": n}` becomes `n`.
pub fn flatten(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            if let Some(edges) = fields.get("edges").and_then(Value::as_array) {
                return Value::Array(
                    edges
                        .iter()
                        .map(|edge| flatten(edge.get("node").unwrap_or(edge)))
                        .collect(),
                );
            }
            if fields.len() == 1 {
                if let Some(node) = fields.get("node") {
                    return flatten(node);
                }
                if let Some(value) = fields.get("value") {
                    return value.clone();
                }
            }
            Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), flatten(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(flatten).collect()),
        other => other.clone(),
    }
}

/// Host variables from the nodes of a query result
///
/// Every node listed under a top-level field becomes a host named after its
/// `display_label`, `name` or `id`, in that order. Nodes with none of these
/// are skipped.
pub fn hostvars_from_query(data: &Value) -> Map<String, Value> {
    let mut hostvars = Map::new();
    let Value::Object(fields) = flatten(data) else {
        return hostvars;
    };

    for nodes in fields.into_values() {
        let Value::Array(nodes) = nodes else {
            continue;
        };
        for node in nodes {
            let Some(host) = ["display_label", "name", "id"]
                .iter()
                .find_map(|key| node.get(*key).and_then(Value::as_str))
                .map(str::to_string)
            else {
                continue;
            };
            hostvars.entry(host).or_insert(node);
        }
    }

    hostvars
}
