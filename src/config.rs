//! Configuration management
//!
//! Configuration can be loaded from an optional TOML file with environment
//! variable overrides on top (`PROKAT_*`). Missing values fall back to
//! sensible defaults, so `Config::default()` alone yields a working client
//! against a local backend.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::i18n::Locale;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Durable storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, including the version prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Display locale used until a persisted one is found
    #[serde(default)]
    pub default_locale: Locale,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            default_locale: Locale::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Durable storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage driver (file or memory)
    #[serde(default)]
    pub driver: StorageDriver,
    /// Path of the store file (file driver only)
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::default(),
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> String {
    "data/prokat-client.json".to_string()
}

/// Storage driver type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    /// JSON file (default)
    #[default]
    File,
    /// In-process map, nothing persisted
    Memory,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing or empty file yields defaults; a malformed file is an
    /// error so typos are not silently ignored.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", path.display(), e))?;

        Ok(config)
    }

    /// Load from a TOML file and apply environment overrides on top.
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Recognized variables:
    /// - PROKAT_API_BASE_URL
    /// - PROKAT_API_TIMEOUT_SECONDS
    /// - PROKAT_API_DEFAULT_LOCALE
    /// - PROKAT_STORAGE_DRIVER
    /// - PROKAT_STORAGE_PATH
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("PROKAT_API_BASE_URL") {
            self.api.base_url = base_url;
        }
        if let Ok(timeout) = std::env::var("PROKAT_API_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(seconds) => self.api.timeout_seconds = seconds,
                Err(_) => tracing::warn!(
                    value = %timeout,
                    "ignoring invalid PROKAT_API_TIMEOUT_SECONDS"
                ),
            }
        }
        if let Ok(locale) = std::env::var("PROKAT_API_DEFAULT_LOCALE") {
            match locale.parse() {
                Ok(locale) => self.api.default_locale = locale,
                Err(_) => tracing::warn!(
                    value = %locale,
                    "ignoring invalid PROKAT_API_DEFAULT_LOCALE"
                ),
            }
        }
        if let Ok(driver) = std::env::var("PROKAT_STORAGE_DRIVER") {
            match driver.as_str() {
                "file" => self.storage.driver = StorageDriver::File,
                "memory" => self.storage.driver = StorageDriver::Memory,
                other => tracing::warn!(value = %other, "ignoring invalid PROKAT_STORAGE_DRIVER"),
            }
        }
        if let Ok(path) = std::env::var("PROKAT_STORAGE_PATH") {
            self.storage.path = path;
        }
    }
}
