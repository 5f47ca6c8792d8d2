//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::Path;

use super::defaults::*;
use super::{global_config_path, CacheConfig, Config, InventoryConfig, ServerConfig};

/// Variables accepted for the API endpoint, in lookup order
const ENDPOINT_ENV_VARS: &[&str] = &["INFRAHUB_API", "INFRAHUB_ADDRESS"];

/// Variables accepted for the API token, in lookup order
const TOKEN_ENV_VARS: &[&str] = &["INFRAHUB_TOKEN", "INFRAHUB_API_TOKEN"];

/// Sections that can be overridden from the environment
#[derive(Deserialize)]
struct Settings {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    inventory: InventoryConfig,
    #[serde(default)]
    cache: CacheConfig,
}

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

fn first_env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `INFRAHUB_` and use double underscores
    /// for nested values. For example:
    /// - `INFRAHUB_SERVER__BRANCH=staging`
    /// - `INFRAHUB_CACHE__ENABLED=true`
    ///
    /// Node kinds, compose expressions and keyed groups are case-sensitive and are
    /// read from the file only.
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        let builder = set_config_default(builder, "server.branch", default_branch())?;
        let builder =
            set_config_default(builder, "server.timeout_secs", default_timeout_secs() as i64)?;
        let builder =
            set_config_default(builder, "server.validate_certs", default_validate_certs())?;
        let mut builder = set_config_default(
            builder,
            "cache.timeout_secs",
            default_cache_timeout_secs() as i64,
        )?;

        // Plugin-style variables only fill in what the file leaves unset
        if let Some(endpoint) = first_env_var(ENDPOINT_ENV_VARS) {
            builder = set_config_default(builder, "server.api_endpoint", endpoint)?;
        }
        if let Some(token) = first_env_var(TOKEN_ENV_VARS) {
            builder = set_config_default(builder, "server.token", token)?;
        }

        // Add the config file if it exists
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        // Add environment variables with INFRAHUB_ prefix
        builder = builder.add_source(
            Environment::with_prefix("INFRAHUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))?;

        let file_config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };

        Ok(Self {
            server: settings.server,
            nodes: file_config.nodes,
            compose: file_config.compose,
            keyed_groups: file_config.keyed_groups,
            inventory: settings.inventory,
            cache: settings.cache,
        })
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. INFRAHUB_API / INFRAHUB_TOKEN style variables (endpoint and token only)
    /// 3. Config file (~/.infrahub/config.toml or custom --config path)
    /// 4. Environment variables (INFRAHUB_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}
