//! Ansible dynamic inventory rendering
//!
//! Resolved nodes become hosts. Their attributes are the host variables,
//! extended by `compose` expressions; `keyed_groups` place hosts in groups
//! named after resolved values. Both read dotted paths into the host
//! variables, where numeric segments index lists.

use anyhow::{bail, Result};
use indexmap::{IndexMap, IndexSet};
use infrahub_core::selection::build_include_from_constructed;
use infrahub_core::value::map_to_json;
use infrahub_core::{Config, KeyedGroup, NodeKind, NodeQuery, ResolvedAttributeMap, ResolvedNodes};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Node queries of a config, with the fields read by compose expressions and
/// keyed groups as the include list of kinds that set none
pub fn node_queries(config: &Config) -> IndexMap<NodeKind, NodeQuery> {
    let derived = build_include_from_constructed(&config.compose, &config.keyed_groups);
    if !derived.is_empty() {
        debug!("Fields read by compose and keyed groups: {derived:?}");
    }

    config
        .nodes
        .iter()
        .map(|(kind, query)| {
            let mut query = query.clone();
            if query.include.is_none() && !derived.is_empty() {
                query.include = Some(derived.clone());
            }
            (kind.clone(), query)
        })
        .collect()
}

/// Follow a dotted path through objects and lists
pub fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(fields) => fields.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`
pub fn sanitize_group_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders resolved nodes as an inventory document
pub struct InventoryRenderer<'a> {
    compose: &'a IndexMap<String, String>,
    keyed_groups: &'a [KeyedGroup],
    strict: bool,
}

impl<'a> InventoryRenderer<'a> {
    pub fn new(
        compose: &'a IndexMap<String, String>,
        keyed_groups: &'a [KeyedGroup],
        strict: bool,
    ) -> Self {
        Self {
            compose,
            keyed_groups,
            strict,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(&config.compose, &config.keyed_groups, config.inventory.strict)
    }

    /// Host variables of one node: its attributes plus composed variables
    pub fn host_vars(&self, host: &str, attributes: &ResolvedAttributeMap) -> Result<Map<String, Value>> {
        let mut vars = match map_to_json(attributes) {
            Value::Object(vars) => vars,
            _ => Map::new(),
        };

        let resolved = Value::Object(vars.clone());
        for (name, expression) in self.compose {
            match lookup_path(&resolved, expression) {
                Some(value) => {
                    vars.insert(name.clone(), value.clone());
                }
                None if self.strict => {
                    bail!("Could not set '{name}' for host {host}: '{expression}' is undefined")
                }
                None => debug!("Skipping '{name}' for host {host}: '{expression}' is undefined"),
            }
        }

        Ok(vars)
    }

    /// Names of the keyed groups a host belongs to
    pub fn groups_for(&self, host: &str, vars: &Map<String, Value>) -> Result<Vec<String>> {
        let vars = Value::Object(vars.clone());
        let mut groups = Vec::new();

        for group in self.keyed_groups {
            let Some(key) = group.key.as_deref() else {
                continue;
            };
            let values = match lookup_path(&vars, key).map(|value| self.group_values(group, value)) {
                Some(values) if !values.is_empty() => values,
                _ => match &group.default_value {
                    Some(default) => vec![default.clone()],
                    None if self.strict => {
                        bail!("Could not add host {host} to keyed group: '{key}' is undefined")
                    }
                    None => {
                        debug!("Host {host} has no value for keyed group '{key}'");
                        continue;
                    }
                },
            };

            for value in values {
                let name = if group.prefix.is_empty() {
                    value
                } else {
                    format!("{}{}{}", group.prefix, group.separator, value)
                };
                groups.push(sanitize_group_name(&name));
            }
        }

        Ok(groups)
    }

    /// Values a resolved key contributes to group names
    ///
    /// Lists yield one value per element and objects one `key<sep>value` per
    /// entry; null and empty strings yield nothing.
    fn group_values(&self, group: &KeyedGroup, value: &Value) -> Vec<String> {
        match value {
            Value::Null => Vec::new(),
            Value::String(s) if s.is_empty() => Vec::new(),
            Value::Array(items) => items
                .iter()
                .flat_map(|item| self.group_values(group, item))
                .collect(),
            Value::Object(fields) => fields
                .iter()
                .map(|(k, v)| format!("{k}{}{}", group.separator, value_text(v)))
                .collect(),
            other => vec![value_text(other)],
        }
    }

    /// Render the full `--list` document
    pub fn render(&self, nodes: &ResolvedNodes) -> Result<Value> {
        let mut hostvars = Map::new();
        let mut groups: IndexMap<String, IndexSet<String>> = IndexMap::new();

        for (host, attributes) in nodes {
            let vars = self.host_vars(host, attributes)?;
            for group in self.groups_for(host, &vars)? {
                groups.entry(group).or_default().insert(host.clone());
            }
            hostvars.insert(host.clone(), Value::Object(vars));
        }

        let hosts: Vec<&String> = nodes.keys().collect();
        let children: Vec<&String> = groups.keys().collect();
        let mut document = Map::new();
        document.insert("_meta".to_string(), json!({ "hostvars": hostvars }));
        document.insert(
            "all".to_string(),
            json!({ "hosts": hosts, "children": children }),
        );
        for (group, members) in &groups {
            if group == "all" || group == "_meta" {
                warn!("Keyed group '{group}' clashes with a reserved name, skipping");
                continue;
            }
            document.insert(group.clone(), json!({ "hosts": members }));
        }

        Ok(Value::Object(document))
    }

    /// Render the variables of a single host (`--host`)
    ///
    /// Unknown hosts render as an empty object.
    pub fn render_host(&self, nodes: &ResolvedNodes, host: &str) -> Result<Value> {
        match nodes.get(host) {
            Some(attributes) => Ok(Value::Object(self.host_vars(host, attributes)?)),
            None => {
                debug!("Host {host} not found in inventory");
                Ok(json!({}))
            }
        }
    }
}
