//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote event service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the event service; every endpoint hangs off this one host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Real-time attendance channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Explicit WebSocket URL; derived from `api.base_url` when unset
    #[serde(default)]
    pub ws_url: Option<String>,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Capacity of the attendee-count broadcast channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay() -> u64 {
    3000
}

fn default_event_buffer() -> usize {
    256
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Client-side persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("eventdesk").to_string_lossy().to_string())
        .unwrap_or_else(|| "./eventdesk_data".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Path of the persisted session document
    pub fn session_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("session.json")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("eventdesk").join("config.toml")),
            Some(PathBuf::from("./eventdesk.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// WebSocket URL for the attendance channel
    ///
    /// Uses `sync.ws_url` when set, otherwise swaps the API scheme for its
    /// WebSocket counterpart and appends `/ws`.
    pub fn ws_url(&self) -> String {
        if let Some(url) = &self.sync.ws_url {
            return url.clone();
        }
        let base = self.api.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws", base)
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("EVENTDESK_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(url) = std::env::var("EVENTDESK_WS_URL") {
            self.sync.ws_url = Some(url);
        }
        if let Ok(data_dir) = std::env::var("EVENTDESK_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Ok(level) = std::env::var("EVENTDESK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("EVENTDESK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Eventdesk Configuration
#
# Environment variables override these settings:
# - EVENTDESK_API_URL
# - EVENTDESK_WS_URL
# - EVENTDESK_DATA_DIR
# - EVENTDESK_LOG_LEVEL
# - EVENTDESK_LOG_FORMAT

[api]
# Event service base URL
base_url = "http://localhost:5000"

# Request timeout in seconds
request_timeout_secs = 30

[sync]
# WebSocket URL for live attendee counts (default: derived from api.base_url)
# ws_url = "ws://localhost:5000/ws"

# Reconnect attempts before the channel is marked degraded
max_reconnect_attempts = 5

# Fixed delay between reconnect attempts (ms)
reconnect_delay_ms = 3000

[storage]
# Directory holding the persisted session and enrollment cache
# (default: the platform data directory, e.g. $HOME/.local/share/eventdesk)
# data_dir = "/var/lib/eventdesk"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
