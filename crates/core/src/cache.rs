//! On-disk cache of resolved inventories
//!
//! Entries are keyed on the graph snapshot (its canonical path and content)
//! and the requested node configuration. Switching snapshots, editing one, or
//! changing the `nodes` section never serves a stale result.

use crate::config::{CacheConfig, NodeQuery};
use crate::error::{Error, Result, ResultExt};
use crate::schema::NodeKind;
use crate::value::ResolvedNodes;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use twox_hash::XxHash3_128;

/// Identify a graph snapshot by its canonical path and a hash of its content
pub fn snapshot_fingerprint(path: &Path) -> Result<String> {
    let canonical = path
        .canonicalize()
        .context(format!("Failed to resolve snapshot {}", path.display()))?;
    let content = std::fs::read(&canonical)
        .context(format!("Failed to read snapshot {}", canonical.display()))?;
    let hash = XxHash3_128::oneshot(&content);
    Ok(format!("{}#{hash:032x}", canonical.display()))
}

/// Compute the cache key of an inventory request
///
/// `source` identifies the graph the nodes are resolved from, see
/// [`snapshot_fingerprint`].
pub fn cache_key(source: &str, nodes: &IndexMap<NodeKind, NodeQuery>) -> Result<String> {
    let nodes_json = serde_json::to_string(nodes)?;
    let material = format!("{source}\n{nodes_json}");
    let hash = XxHash3_128::oneshot(material.as_bytes());
    Ok(format!("{hash:032x}"))
}

/// Cache of resolved node mappings stored as JSON files
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
    timeout: Option<Duration>,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            dir: expand_home(dir.into()),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    /// Cache described by configuration, or `None` when caching is disabled
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.dir.clone(), config.timeout_secs))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a cached result; missing, expired or unreadable entries are misses
    pub fn get(&self, key: &str) -> Option<ResolvedNodes> {
        let path = self.entry_path(key);
        match self.read_entry(&path) {
            Ok(Some(nodes)) => {
                debug!("Cache hit for {key}");
                Some(nodes)
            }
            Ok(None) => {
                debug!("Cache miss for {key}");
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn read_entry(&self, path: &Path) -> Result<Option<ResolvedNodes>> {
        if !path.exists() {
            return Ok(None);
        }
        if let Some(timeout) = self.timeout {
            let modified = std::fs::metadata(path)?.modified()?;
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or_default();
            if age > timeout {
                return Ok(None);
            }
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Store a result
    pub fn set(&self, key: &str, nodes: &ResolvedNodes) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context(format!(
            "Failed to create cache directory {}",
            self.dir.display()
        ))?;
        let content = serde_json::to_string(nodes)?;
        let path = self.entry_path(key);
        std::fs::write(&path, content)
            .map_err(|e| Error::cache(format!("Failed to write {}: {e}", path.display())))
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or(path.clone(), |home| home.join(rest)),
        Err(_) => path,
    }
}
