//! Settings store: externally persisted per-destination credentials
//!
//! The store owns `{enabled, token, instance}` for each destination.
//! The core reads it once per cross-post request and writes only to
//! clear a token the destination has rejected.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;

/// Stored settings for one destination platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationSettings {
    pub enabled: bool,

    /// Opaque bearer token; empty means not authorized
    #[serde(default)]
    pub token: String,

    /// Instance host, with or without an `http(s)://` prefix
    #[serde(default)]
    pub instance: String,
}

impl DestinationSettings {
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read one destination's settings. `None` means the destination
    /// is not configured at all.
    async fn load(&self, platform: &str) -> Option<DestinationSettings>;

    /// Remove the stored token for a destination. Called when the
    /// destination rejects it; a one-way transition until the user
    /// re-authorizes.
    async fn clear_token(&self, platform: &str) -> Result<()>;
}

/// Settings store backed by the TOML config file.
///
/// The file is re-read on every `load` so edits made while the watcher
/// runs are picked up on the next request.
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn load(&self, platform: &str) -> Option<DestinationSettings> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read settings file {:?}: {}", self.path, e);
                return None;
            }
        };
        let config: Config = match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse settings file {:?}: {}", self.path, e);
                return None;
            }
        };
        config.destinations.get(platform).cloned()
    }

    async fn clear_token(&self, platform: &str) -> Result<()> {
        let mut config = Config::load_from_path(&self.path)?;
        if let Some(settings) = config.destinations.get_mut(platform) {
            settings.token.clear();
            config.save_to_path(&self.path)?;
            info!("Cleared stored {} token", platform);
        }
        Ok(())
    }
}

/// In-memory settings store for tests and embedding
#[derive(Default)]
pub struct MemorySettingsStore {
    inner: Mutex<BTreeMap<String, DestinationSettings>>,
    cleared: Mutex<Vec<String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, platform: &str, settings: DestinationSettings) {
        self.inner
            .lock()
            .unwrap()
            .insert(platform.to_string(), settings);
    }

    /// Platforms whose token has been cleared, in order
    pub fn cleared(&self) -> Vec<String> {
        self.cleared.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self, platform: &str) -> Option<DestinationSettings> {
        self.inner.lock().unwrap().get(platform).cloned()
    }

    async fn clear_token(&self, platform: &str) -> Result<()> {
        if let Some(settings) = self.inner.lock().unwrap().get_mut(platform) {
            settings.token.clear();
        }
        self.cleared.lock().unwrap().push(platform.to_string());
        Ok(())
    }
}
