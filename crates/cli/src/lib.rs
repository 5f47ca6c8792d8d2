//! Library interface for the infrahub-inventory CLI
//!
//! This module exposes the inventory pipeline for integration testing while
//! keeping argument handling in main.rs.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod graphql;
pub mod inventory;

use anyhow::{anyhow, Context, Result};
use infrahub_core::selection::select_fields;
use infrahub_core::{
    cache_key, snapshot_fingerprint, Config, FieldDescriptor, MemorySource, Orchestrator,
    ResolvedNodes, ResultCache, SchemaDescriptor,
};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, warn};

pub use inventory::{node_queries, InventoryRenderer};

/// Resolve the configured node kinds, going through the result cache when enabled
///
/// `snapshot` overrides `inventory.snapshot` from the configuration. Runs that
/// resolve no node are not cached.
pub async fn resolve_inventory(config: &Config, snapshot: Option<&Path>) -> Result<ResolvedNodes> {
    let path = snapshot
        .or(config.inventory.snapshot.as_deref())
        .ok_or_else(|| anyhow!("No graph snapshot configured. Pass --snapshot or set inventory.snapshot"))?;
    let queries = node_queries(config);

    let cache = match ResultCache::from_config(&config.cache) {
        Some(cache) => Some((cache, cache_key(&snapshot_fingerprint(path)?, &queries)?)),
        None => None,
    };
    if let Some((cache, key)) = &cache {
        if let Some(cached) = cache.get(key) {
            info!("Using cached inventory ({} hosts)", cached.len());
            return Ok(cached);
        }
    }

    let source = MemorySource::load(path)
        .with_context(|| format!("Failed to load graph snapshot {}", path.display()))?;

    let Some(nodes) = Orchestrator::new(&source).resolve_all(&queries).await else {
        info!("No nodes resolved");
        return Ok(ResolvedNodes::new());
    };

    if let Some((cache, key)) = &cache {
        if let Err(e) = cache.set(key, &nodes) {
            warn!("Failed to write inventory cache: {e}");
        }
    }

    Ok(nodes)
}

/// Summary of a schema printed by the `schema` command
pub fn schema_summary(schema: &SchemaDescriptor) -> Value {
    let attributes: Vec<&str> = schema.attributes().map(|attr| attr.name.as_str()).collect();
    let relationships: Vec<Value> = schema
        .fields()
        .filter_map(|field| match field {
            FieldDescriptor::Relationship(rel) => Some(json!({
                "name": rel.name,
                "peer": rel.peer,
                "cardinality": rel.cardinality,
                "kind": rel.kind,
                "included_by_default": rel.included_by_default(),
            })),
            FieldDescriptor::Attribute(_) => None,
        })
        .collect();

    json!({
        "kind": schema.kind(),
        "inherit_from": schema.inherit_from(),
        "attributes": attributes,
        "relationships": relationships,
        "default_selection": select_fields(schema, None),
    })
}
