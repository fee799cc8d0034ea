//! Parce configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Explicit config file (--config)
//! 3. Project-level (./parce.toml)
//! 4. Default values
//! ```
//!
//! # Example
//!
//! ```toml
//! [optimizer]
//! constant_folding = true
//! dead_code_elimination = false
//!
//! [vm]
//! max_steps = 100000
//! trace_execution = false
//!
//! [log]
//! level = "debug"
//! ```

use crate::middle::optimizer::OptimizerConfig;
use crate::util::logger::LogLevel;
use crate::vm::VMConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Project-level config file name
pub const CONFIG_FILE_NAME: &str = "parce.toml";

/// Pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Optimizer passes
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// VM limits and tracing
    #[serde(default)]
    pub vm: VMConfig,
    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

/// Log configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

impl PipelineConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Render as a TOML document
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load configuration from an explicit file
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    PipelineConfig::from_toml(&content)
}

/// Load `parce.toml` from `dir`, falling back to defaults if it doesn't exist
pub fn load_project_config(dir: &Path) -> Result<PipelineConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(PipelineConfig::default());
    }
    load_config(&path)
}

/// Resolve the effective configuration: explicit path, then project file
pub fn resolve_config(explicit: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    match explicit {
        Some(path) => load_config(path),
        None => load_project_config(Path::new(".")),
    }
}
