//! Synchronizer settings and their persistence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
};

use crate::error::CanopyError;

/// Tunable parameters of vault synchronization. Defaults match the behavior
/// the rest of the crate documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long a write fingerprint stays eligible for echo matching.
    pub echo_ttl_ms: u64,
    /// Bounded retry count for reads racing an editor's own write.
    pub read_retry_attempts: u32,
    /// Base backoff between read retries; doubles per attempt.
    pub read_retry_base_ms: u64,
    /// Coalescing window of the filesystem debouncer.
    pub debounce_ms: u64,
    /// Document extension the watcher manages. Other files are ignored. This
    /// governs watcher filtering only; id and reference normalization always
    /// strip [`crate::codec::DOC_EXTENSION`].
    pub managed_extension: String,
    /// Hop bound used when an extraction query does not supply one.
    pub default_max_distance: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            echo_ttl_ms: 300,
            read_retry_attempts: 5,
            read_retry_base_ms: 50,
            debounce_ms: 250,
            managed_extension: crate::codec::DOC_EXTENSION.to_string(),
            default_max_distance: 2,
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_sync(&self) -> Result<SyncConfig, CanopyError>;
    fn set_sync(&self, config: SyncConfig) -> Result<(), CanopyError>;
}

/// File-backed provider storing the config under a `[sync]` table.
#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_sync(&self) -> Result<SyncConfig, CanopyError> {
        tracing::debug!("Attempting to read sync config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, returning defaults.");
            return Ok(SyncConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let config: BTreeMap<String, SyncConfig> = toml::from_str(&content)?;
        config
            .get("sync")
            .cloned()
            .ok_or_else(|| CanopyError::NotFound("sync not found in config".to_string()))
    }

    fn set_sync(&self, sync: SyncConfig) -> Result<(), CanopyError> {
        tracing::debug!("Attempting to write sync config to: {:?}", &self.path);
        let mut config = BTreeMap::new();
        config.insert("sync".to_string(), sync);
        let toml_string = toml::to_string(&config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}
