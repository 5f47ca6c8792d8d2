//! Default values and functions for configuration

use std::path::PathBuf;

// Default constants
pub(crate) const DEFAULT_BRANCH: &str = "main";
pub(crate) const DEFAULT_KEYED_GROUP_SEPARATOR: &str = "_";
pub(crate) const CONFIG_DIR_NAME: &str = ".infrahub";

pub(crate) fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

pub(crate) fn default_timeout_secs() -> u64 {
    10
}

pub(crate) fn default_validate_certs() -> bool {
    true
}

pub(crate) fn default_cache_timeout_secs() -> u64 {
    3600
}

pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIR_NAME)
        .join("cache")
}

pub(crate) fn default_keyed_group_separator() -> String {
    DEFAULT_KEYED_GROUP_SEPARATOR.to_string()
}
