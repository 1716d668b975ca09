//! Client configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Environment variables override file values.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Keys under which the session is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub token: String,
    pub user: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            token: "token".to_string(),
            user: "user".to_string(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Settings for a client process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root that entity and login paths are appended to.
    pub base_url: String,
    /// Per-request limit in milliseconds; `0` waits forever.
    pub request_timeout_ms: u64,
    /// Whether the built-in `admin`/`admin123` login is accepted.
    pub allow_local_admin: bool,
    /// SQLite file for the session. Required by `open_client`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
    pub storage_keys: StorageKeys,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            allow_local_admin: true,
            storage_path: None,
            storage_keys: StorageKeys::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// JSON configuration overridden by the environment.
    pub fn from_json_with_env(json: &str) -> Result<Self, ConfigError> {
        let mut config = Self::from_json(json)?;
        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// `None` when the timeout is disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = var("CLINIC_SYNC_BASE_URL") {
            self.base_url = url;
        }
        if let Some(raw) = var("CLINIC_SYNC_TIMEOUT_MS") {
            self.request_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "CLINIC_SYNC_TIMEOUT_MS",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = var("CLINIC_SYNC_LOCAL_ADMIN") {
            self.allow_local_admin = parse_bool("CLINIC_SYNC_LOCAL_ADMIN", &raw)?;
        }
        if let Some(path) = var("CLINIC_SYNC_DB_PATH") {
            self.storage_path = Some(PathBuf::from(path));
        }
        if let Some(level) = var("CLINIC_SYNC_LOG") {
            self.logging.level = level;
        }
        if let Some(raw) = var("CLINIC_SYNC_LOG_JSON") {
            self.logging.json = parse_bool("CLINIC_SYNC_LOG_JSON", &raw)?;
        }
        Ok(())
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: raw.to_string(),
        }),
    }
}
