//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use wavesync_core::{CatalogDefinition, FanoutConfig, InMemoryCatalog, PlaybackConfig};

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = OS-assigned).
    /// Override: `WAVESYNC_BIND_PORT`
    pub bind_port: u16,

    /// Catalog file (YAML) describing playlists and tracks.
    /// Override: `WAVESYNC_CATALOG`
    pub catalog_path: Option<PathBuf>,

    /// Directory holding audio files, addressed by each track's storage key.
    /// Override: `WAVESYNC_MEDIA_DIR`
    pub media_dir: PathBuf,

    /// Playback scheduling.
    pub playback: PlaybackConfig,

    /// Listener fan-out tuning.
    pub fanout: FanoutConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_port: 49500,
            catalog_path: None,
            media_dir: PathBuf::from("media"),
            playback: PlaybackConfig::default(),
            fanout: FanoutConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WAVESYNC_SHUFFLE") {
            if let Ok(shuffle) = val.parse() {
                self.playback.shuffle = shuffle;
            }
        }

        if let Ok(val) = std::env::var("WAVESYNC_TICK_INTERVAL_MS") {
            if let Ok(ms) = val.parse() {
                self.playback.tick_interval_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("WAVESYNC_QUEUE_SYNC_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.playback.queue_sync_interval_secs = secs;
            }
        }

        // Note: port, catalog, media dir and playlist are handled by clap via
        // #[arg(env = ...)] in main.rs
    }

    /// Converts to wavesync-core's Config type.
    pub fn to_core_config(&self) -> wavesync_core::Config {
        wavesync_core::Config {
            preferred_port: self.bind_port,
            playback: self.playback.clone(),
            fanout: self.fanout.clone(),
        }
    }
}

/// Loads a catalog file into an in-memory catalog.
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    let definition: CatalogDefinition = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;
    InMemoryCatalog::from_definition(definition)
        .with_context(|| format!("Invalid catalog: {}", path.display()))
}
