//! Field selection for node fetches
//!
//! By default a fetch requests every attribute, every single-cardinality
//! relationship and the multi-cardinality relationships classified as
//! attribute-like or parent. Generic multi-valued relationships are left out
//! since they can be unbounded.

use crate::config::KeyedGroup;
use crate::schema::{NodeKind, SchemaDescriptor};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// Compute the default field selection of a schema
///
/// Attributes come first, then relationships, each in declaration order.
/// Names listed in `exclude` are dropped.
pub fn select_fields(schema: &SchemaDescriptor, exclude: Option<&[String]>) -> Vec<String> {
    let exclude = exclude.unwrap_or_default();
    let is_excluded = |name: &str| exclude.iter().any(|e| e == name);

    let attributes = schema
        .attributes()
        .filter(|attr| !is_excluded(&attr.name))
        .map(|attr| attr.name.as_str());
    let relationships = schema
        .relationships()
        .filter(|rel| !is_excluded(&rel.name) && rel.included_by_default())
        .map(|rel| rel.name.as_str());

    let selected: IndexSet<&str> = attributes.chain(relationships).collect();
    selected.into_iter().map(str::to_string).collect()
}

/// Peer kinds of the selected relationships
pub fn related_kinds(schema: &SchemaDescriptor, selected: &[String]) -> HashSet<NodeKind> {
    schema
        .relationships()
        .filter(|rel| selected.iter().any(|name| *name == rel.name))
        .map(|rel| rel.peer.clone())
        .collect()
}

/// Derive an include list from compose expressions and keyed groups
///
/// Every compose value and group key contributes the segment before its first
/// `.`, since that is the top-level field the expression reads. Compose values
/// come first, then group keys; duplicates are kept.
pub fn build_include_from_constructed(
    compose: &IndexMap<String, String>,
    groups: &[KeyedGroup],
) -> Vec<String> {
    let head = |expr: &str| expr.split('.').next().unwrap_or_default().to_string();

    compose
        .values()
        .map(|value| head(value.as_str()))
        .chain(
            groups
                .iter()
                .filter_map(|group| group.key.as_deref())
                .map(head),
        )
        .collect()
}
