use crate::error::{Result, SyncError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub base_url: String,
    /// Stored token; `PERMIT_SYNC_API_KEY` overrides it at load time so the
    /// config file can be committed without the secret.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl RegistryConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// SyncConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub registry: RegistryConfig,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Processed events older than this are eligible for purge.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_version() -> u32 {
    1
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_retention_days() -> i64 {
    90
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            version: 1,
            registry: RegistryConfig {
                base_url: base_url.into(),
                api_key: String::new(),
                timeout_secs: default_timeout_secs(),
            },
            poll_interval_secs: default_poll_interval_secs(),
            retention_days: default_retention_days(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SyncError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let mut cfg: SyncConfig = serde_yaml::from_str(&data)?;
        if let Ok(key) = std::env::var("PERMIT_SYNC_API_KEY") {
            cfg.registry.api_key = key;
        }
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
