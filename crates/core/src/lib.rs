//! Core types and resolution engine for building Infrahub inventories
//!
//! This crate turns nodes fetched from an Infrahub graph into flat attribute
//! maps suitable for an Ansible dynamic inventory:
//!
//! - **Schemas**: per-kind field descriptors classifying attributes and relationships
//! - **Sources**: the [`GraphSource`] seam through which schemas and nodes are fetched
//! - **Resolution**: recursive dereferencing of relationships into nested maps
//! - **Configuration**: server, node selection and inventory settings
//! - **Caching**: on-disk cache of resolved inventories
//!

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod node;
pub mod orchestrator;
pub mod resolver;
pub mod schema;
pub mod selection;
pub mod source;
pub mod value;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use cache::{cache_key, snapshot_fingerprint, ResultCache};
pub use config::{Config, KeyedGroup, NodeQuery, ServerConfig};
pub use error::{Error, Result, ResultExt};
pub use memory::{MemorySource, Snapshot};
pub use node::{IdentityStore, Node, NodeRef, RelationshipValue};
pub use orchestrator::Orchestrator;
pub use resolver::Resolver;
pub use schema::{
    AttributeSchema, Cardinality, FieldDescriptor, NodeKind, RelationshipKind,
    RelationshipSchema, SchemaDescriptor, SchemaStore,
};
pub use source::{FetchError, FetchRequest, GraphSource};
pub use value::{ResolvedAttributeMap, ResolvedNodes, ResolvedValue};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Result, ResultExt};
    pub use crate::orchestrator::Orchestrator;
    pub use crate::source::GraphSource;
}
