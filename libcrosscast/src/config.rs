//! Configuration management for Crosscast

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::settings::DestinationSettings;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Per-destination settings, keyed by platform name ("mastodon")
    #[serde(default)]
    pub destinations: BTreeMap<String, DestinationSettings>,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path of the page snapshot file the capture helper keeps updated
    pub page: Option<String>,

    /// Sidecar directory holding rasterized media, keyed by source URL
    pub raster_dir: Option<String>,

    /// Snapshot poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            page: None,
            raster_dir: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Destinations targeted when none are named on the command line
    pub targets: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            targets: vec!["mastodon".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Write configuration back to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        let mut destinations = BTreeMap::new();
        destinations.insert(
            "mastodon".to_string(),
            DestinationSettings {
                enabled: false,
                token: String::new(),
                instance: "mastodon.social".to_string(),
            },
        );
        Self {
            destinations,
            watch: WatchConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CROSSCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("crosscast").join("config.toml"))
}
