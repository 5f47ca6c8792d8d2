//! Configuration module for the inventory system
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides. The API endpoint and token additionally fall back to the
//! `INFRAHUB_API`/`INFRAHUB_ADDRESS` and `INFRAHUB_TOKEN`/`INFRAHUB_API_TOKEN`
//! variables.

mod defaults;
mod loading;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use crate::schema::NodeKind;
use crate::source::FetchRequest;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.infrahub/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(CONFIG_DIR_NAME).join("config.toml"))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API server connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Node kinds to fetch, with per-kind field selection and filters
    #[serde(default)]
    pub nodes: IndexMap<NodeKind, NodeQuery>,

    /// Host variables composed from resolved attributes
    #[serde(default)]
    pub compose: IndexMap<String, String>,

    /// Groups keyed on resolved attributes
    #[serde(default)]
    pub keyed_groups: Vec<KeyedGroup>,

    /// Inventory rendering options
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Result cache
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Connection settings for the API server
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the API (trailing slashes are ignored)
    #[serde(default)]
    pub api_endpoint: Option<String>,

    /// API token (or use INFRAHUB_TOKEN / INFRAHUB_API_TOKEN env vars)
    #[serde(default)]
    pub token: Option<String>,

    /// Branch in which requests are made
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether to validate the server's TLS certificate
    #[serde(default = "default_validate_certs")]
    pub validate_certs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            token: None,
            branch: default_branch(),
            timeout_secs: default_timeout_secs(),
            validate_certs: default_validate_certs(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("token", &self.token.as_ref().map(|_| "***REDACTED***"))
            .field("branch", &self.branch)
            .field("timeout_secs", &self.timeout_secs)
            .field("validate_certs", &self.validate_certs)
            .finish()
    }
}

impl ServerConfig {
    /// API endpoint without trailing slashes
    pub fn endpoint(&self) -> Result<&str> {
        self.api_endpoint
            .as_deref()
            .map(|endpoint| endpoint.trim().trim_end_matches('/'))
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| {
                Error::config(
                    "Missing API endpoint. Set server.api_endpoint or INFRAHUB_API env var",
                )
            })
    }

    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::config("Missing API token. Set server.token or INFRAHUB_TOKEN env var")
            })
    }

    /// Validate connection settings
    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;
        self.token()?;
        if self.branch.is_empty() {
            return Err(Error::config("server.branch cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config(
                "server.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Field selection and filters for one node kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeQuery {
    /// Fields to request; replaces the default selection entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,

    /// Fields removed from the default selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    /// Server-side filters, e.g. `site__name__value = "atl1"`
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub filters: IndexMap<String, Value>,
}

impl NodeQuery {
    /// Include override, when one with at least one field is configured
    pub fn include_override(&self) -> Option<&[String]> {
        self.include.as_deref().filter(|include| !include.is_empty())
    }

    pub fn to_fetch_request(&self) -> FetchRequest {
        FetchRequest {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            filters: self.filters.clone(),
        }
    }
}

/// Inventory group keyed on a resolved attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedGroup {
    /// Dotted path into the resolved attributes, e.g. `site.name`
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_keyed_group_separator")]
    pub separator: String,

    /// Value used when the key resolves to nothing
    #[serde(default)]
    pub default_value: Option<String>,
}

impl Default for KeyedGroup {
    fn default() -> Self {
        Self {
            key: None,
            prefix: String::new(),
            separator: default_keyed_group_separator(),
            default_value: None,
        }
    }
}

/// Inventory rendering options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Fail on compose expressions and group keys that do not resolve
    #[serde(default)]
    pub strict: bool,

    /// JSON graph snapshot nodes are resolved from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

/// Configuration for the result cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Directory holding cached results
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Age in seconds after which an entry is stale (0 = never)
    #[serde(default = "default_cache_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_cache_dir(),
            timeout_secs: default_cache_timeout_secs(),
        }
    }
}

impl Config {
    /// Validate the configuration for an inventory run
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;

        if self.nodes.is_empty() {
            return Err(Error::config(
                "'nodes' must be defined with at least one node kind".to_string(),
            ));
        }

        for (kind, query) in &self.nodes {
            if kind.as_str().is_empty() {
                return Err(Error::config("node kind names cannot be empty".to_string()));
            }
            if query.include.is_some() && query.exclude.is_some() {
                tracing::warn!("{kind}: 'include' is set, 'exclude' will be ignored");
            }
        }

        if let Some(index) = self.keyed_groups.iter().position(|g| g.key.is_none()) {
            tracing::warn!("keyed_groups[{index}] has no key and will be ignored");
        }

        Ok(())
    }
}
