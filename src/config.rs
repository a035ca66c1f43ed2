//! Configuration
//!
//! Layered configuration: defaults, then an optional TOML file, then
//! `MDINDEX_*` environment variables. The file is looked up as
//! `mdindex.toml` in the working directory when no explicit path is given.

use crate::error::SyncError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Indexing run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Folder to index
    #[serde(default = "default_folder")]
    pub folder: PathBuf,

    /// Store location; `None` keeps the index in memory only
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Ignore patterns (regular expressions over the path)
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Keep watching the folder after the initial batch run
    #[serde(default)]
    pub watch: bool,

    /// Debounce window for watch mode, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_folder() -> PathBuf {
    PathBuf::from(".")
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            folder: default_folder(),
            store_path: None,
            ignore_patterns: Vec::new(),
            watch: false,
            debounce_ms: default_debounce_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Load configuration with precedence: defaults < file < environment.
pub fn load_config(path: Option<&Path>) -> Result<IndexConfig, SyncError> {
    let mut builder = Config::builder();
    builder = match path {
        Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml)),
        None => builder.add_source(File::new("mdindex", FileFormat::Toml).required(false)),
    };
    builder = builder.add_source(Environment::with_prefix("MDINDEX").separator("__"));

    builder
        .build()
        .and_then(Config::try_deserialize)
        .map_err(|e| SyncError::Config(e.to_string()))
}
