//! Application configuration loaded from TOML.
//!
//! ```toml
//! [fetch]
//! max_parallel = 6
//!
//! [screen]
//! trend_mode = "hybrid"
//! strictness = "normal"
//!
//! [sell]
//! peak_drawdown_action = "SELL_ALL"
//!
//! [pipeline]
//! task_timeout_secs = 120
//! ```
//!
//! Every table and every field is optional; an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use trendscan_core::data::{FetchConfig, UniverseError};
use trendscan_core::screen::ScreenConfig;
use trendscan_core::sell::SellConfig;

/// Errors raised while loading configuration, universe or position files.
///
/// All of these surface before any network call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path} line {line}: unparseable date '{value}'")]
    BadDate {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{path} line {line}: bad {field} '{value}'")]
    BadNumber {
        path: PathBuf,
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("{path}: malformed CSV: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-task wait before the collector gives up on the remaining tasks.
    pub task_timeout_secs: u64,
    /// Override the worker count; otherwise min(max_parallel, max(2, cpus)).
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            task_timeout_secs: 120,
            threads: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub screen: ScreenConfig,
    pub sell: SellConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fully populated TOML, suitable as a starting config file.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Content hash of the effective configuration.
    ///
    /// Two runs with the same fingerprint applied identical thresholds, so
    /// their outputs are comparable.
    pub fn fingerprint(&self) -> String {
        // Plain data with string keys: serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex()[..16].to_string()
    }
}
