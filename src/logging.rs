//! Logging System
//!
//! Structured logging via the `tracing` crate. The level string accepts full
//! `EnvFilter` directives, so module-specific levels like
//! `mdindex::links=trace` work as-is; `MDINDEX_LOG` overrides the configured
//! level at runtime.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or filter directive: trace, debug, info, warn, error
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            enabled: default_true(),
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Initialize the global subscriber. Safe to call once per process.
pub fn init_logging(config: &LoggingConfig) -> Result<(), SyncError> {
    if !config.enabled {
        return Ok(());
    }
    let filter = EnvFilter::try_from_env("MDINDEX_LOG")
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| SyncError::Config(format!("invalid log level '{}': {e}", config.level)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.format.as_str() {
        "json" => builder
            .json()
            .try_init()
            .map_err(|e| SyncError::Config(format!("failed to init logging: {e}"))),
        "text" => builder
            .try_init()
            .map_err(|e| SyncError::Config(format!("failed to init logging: {e}"))),
        other => Err(SyncError::Config(format!("unknown log format '{other}'"))),
    }
}
