//! Runtime configuration, loaded from a JSON file at startup.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    /// Path to the station directory CSV.
    #[serde(default = "default_stations_path")]
    pub stations_path: String,

    /// Feed name → GTFS-RT endpoint URL.
    pub feeds: HashMap<String, String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Feed polling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Seconds between poll cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds without a successful update before the cache reports
    /// stale. Must exceed `interval_secs`.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Config {
    /// Load and validate configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.stale_after_secs <= self.polling.interval_secs {
            return Err(ConfigError::StaleThreshold {
                stale_after_secs: self.polling.stale_after_secs,
                interval_secs: self.polling.interval_secs,
            });
        }
        Ok(())
    }
}

impl PollingConfig {
    /// Poll interval as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Staleness threshold as a Duration.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_interval_secs() -> u64 {
    30
}

fn default_stale_after_secs() -> u64 {
    90
}

fn default_stations_path() -> String {
    "data/stations.csv".to_string()
}

/// Errors loading configuration. Startup-only and process-fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Could not read the config file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    /// Staleness threshold would false-positive on ordinary jitter
    #[error(
        "stale_after_secs ({stale_after_secs}) must exceed interval_secs ({interval_secs})"
    )]
    StaleThreshold {
        stale_after_secs: u64,
        interval_secs: u64,
    },
}
