//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::query::DEFAULT_INTERVAL_SECS;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retention and eviction configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_bucket_width")]
    pub bucket_width_secs: i64,

    #[serde(default = "default_horizon")]
    pub horizon_secs: i64,

    #[serde(default = "default_health_slack")]
    pub health_slack_secs: i64,

    #[serde(default = "default_full_sweep_every")]
    pub full_sweep_every: i64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,
}

fn default_bucket_width() -> i64 {
    5
}

fn default_horizon() -> i64 {
    60
}

fn default_health_slack() -> i64 {
    5
}

fn default_full_sweep_every() -> i64 {
    8
}

fn default_sweep_interval() -> u64 {
    4000 // 4 seconds
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            bucket_width_secs: default_bucket_width(),
            horizon_secs: default_horizon(),
            health_slack_secs: default_health_slack(),
            full_sweep_every: default_full_sweep_every(),
            sweep_interval_ms: default_sweep_interval(),
        }
    }
}

/// Command listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_ingest_port")]
    pub port: u16,

    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_ingest_port() -> u16 {
    7450
}

fn default_max_line_bytes() -> usize {
    64 * 1024 // 64 KB
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_ingest_port(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl IngestConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP query server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,

    #[serde(default = "default_interval")]
    pub default_interval_secs: f64,
}

fn default_api_port() -> u16 {
    7451
}

fn default_interval() -> f64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_api_port(),
            default_interval_secs: default_interval(),
        }
    }
}

impl ApiConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
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

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
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
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tas").join("config.toml")),
            Some(PathBuf::from("/etc/tas/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Reject values that would break bucket arithmetic or rate division
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention.bucket_width_secs <= 0 {
            return Err(ConfigError::Invalid(
                "retention.bucket_width_secs must be > 0".to_string(),
            ));
        }
        if self.retention.full_sweep_every <= 0 {
            return Err(ConfigError::Invalid(
                "retention.full_sweep_every must be > 0".to_string(),
            ));
        }
        if self.retention.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "retention.sweep_interval_ms must be > 0".to_string(),
            ));
        }
        if !(self.api.default_interval_secs.is_finite() && self.api.default_interval_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "api.default_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Ingest overrides
        if let Some(host) = lookup("TAS_INGEST_HOST") {
            self.ingest.host = host;
        }
        if let Some(port) = lookup("TAS_INGEST_PORT").and_then(|p| p.parse().ok()) {
            self.ingest.port = port;
        }

        // API overrides
        if let Some(host) = lookup("TAS_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("TAS_API_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }

        // Retention overrides
        if let Some(horizon) = lookup("TAS_RETENTION_HORIZON_SECS").and_then(|h| h.parse().ok()) {
            self.retention.horizon_secs = horizon;
        }

        // Logging overrides
        if let Some(level) = lookup("TAS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TAS_LOG_FORMAT") {
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

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# tas Configuration
#
# Environment variables override these settings:
# - TAS_INGEST_HOST
# - TAS_INGEST_PORT
# - TAS_API_HOST
# - TAS_API_PORT
# - TAS_RETENTION_HORIZON_SECS
# - TAS_LOG_LEVEL
# - TAS_LOG_FORMAT

[retention]
# Width of a timestamp bucket (seconds)
bucket_width_secs = 5

# How long samples are kept (seconds)
horizon_secs = 60

# Extra age tolerated before the evictor is reported as stalled (seconds)
health_slack_secs = 5

# Boundaries divisible by this trigger a full sweep instead of a targeted one
full_sweep_every = 8

# How often the evictor runs (ms)
sweep_interval_ms = 4000

[ingest]
# Command listener host
host = "0.0.0.0"

# Command listener port
port = 7450

# Longest accepted command line (bytes)
max_line_bytes = 65536

[api]
# Query server host
host = "0.0.0.0"

# Query server port
port = 7451

# Rate divisor when a query omits `i`
default_interval_secs = 5.0

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
