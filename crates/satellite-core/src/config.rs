//! Configuration loading and typed config structures for Satellite.
//!
//! The configuration lives in `satellite-config.yaml` in the working
//! directory, or wherever `SATELLITE_CONFIG` points. This module defines
//! strongly-typed structs that mirror the YAML structure. Every field has a
//! default, so a missing or empty file yields a runnable configuration.

use std::path::{Path, PathBuf};

use satellite_types::EntityKind;
use serde::Deserialize;

/// Default configuration file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "satellite-config.yaml";

/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "SATELLITE_CONFIG";

/// Environment variable overriding `output.dir`.
pub const OUTPUT_DIR_ENV: &str = "SATELLITE_OUTPUT_DIR";

/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV: &str = "SATELLITE_LOG_LEVEL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SatelliteConfig {
    /// Where snapshots are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level and format.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Watch sources feeding the entity store.
    #[serde(default)]
    pub watch: WatchConfig,
}

impl SatelliteConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `SATELLITE_OUTPUT_DIR` overrides `output.dir`
    /// - `SATELLITE_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve the configuration file path: `SATELLITE_CONFIG` if set,
    /// else [`DEFAULT_CONFIG_PATH`].
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
    }

    /// Override values with process environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|name| std::env::var(name).ok());
    }

    /// Override values using `lookup` in place of the process environment.
    pub fn apply_env_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(OUTPUT_DIR_ENV) {
            self.output.dir = PathBuf::from(val);
        }
        if let Some(val) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = val;
        }
    }
}

/// Snapshot output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `graph-*.json` files. Created on first write.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when
    /// set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Watch source configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchConfig {
    /// One entry per watch stream, typically one per watched kind.
    #[serde(default)]
    pub sources: Vec<WatchSourceConfig>,

    /// Request shutdown (with a final snapshot) once every source has
    /// reached end of stream.
    #[serde(default)]
    pub exit_when_sources_end: bool,
}

/// One watch stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchSourceConfig {
    /// File or FIFO carrying watch events; `-` reads standard input.
    pub path: PathBuf,

    /// Kind watched by this stream. Objects that do not state their own
    /// kind are taken to be of this kind.
    pub kind: EntityKind,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_owned()
}
