//! Configuration parsing
//!
//! Reads `[session]` and `[source]` tables from a TOML file. Every field is
//! optional; a missing file yields the defaults.

use crate::search::SearchBackend;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrreryConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

/// Browsing and search behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Records per browsing window (>= 1)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Quiet period before a query edit turns into a search
    #[serde(default = "default_debounce_interval_ms")]
    pub debounce_interval_ms: u64,

    /// Walk remaining server pages into the local index in the background
    #[serde(default)]
    pub background_backfill: bool,

    /// "remote" (server search) or "local" (filter the local index)
    #[serde(default)]
    pub search_backend: SearchBackend,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            debounce_interval_ms: default_debounce_interval_ms(),
            background_backfill: false,
            search_backend: SearchBackend::default(),
        }
    }
}

impl SessionConfig {
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }
}

/// Remote listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Collection path, relative to `base_url`
    #[serde(default = "default_collection_path")]
    pub collection_path: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            collection_path: default_collection_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_page_size() -> usize { 10 }
fn default_debounce_interval_ms() -> u64 { 300 }
fn default_base_url() -> String { "https://swapi.dev/api/".to_string() }
fn default_collection_path() -> String { "planets/".to_string() }
fn default_request_timeout_ms() -> u64 { 10_000 }

impl OrreryConfig {
    /// Check values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.session.page_size == 0 {
            return Err(ConfigError::Invalid(
                "session.page_size must be at least 1".to_string(),
            ));
        }
        Url::parse(&self.source.base_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "source.base_url '{}' is not a valid URL: {}",
                self.source.base_url, e
            ))
        })?;
        if self.source.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "source.request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from a file, falling back to defaults when it is absent
pub fn load_config(config_path: &Path) -> Result<OrreryConfig> {
    if !config_path.exists() {
        return Ok(OrreryConfig::default());
    }

    let content = std::fs::read_to_string(config_path)?;
    let config: OrreryConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
