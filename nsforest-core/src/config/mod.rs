//! Configuration management for nsforest
//!
//! Defaults, environment overrides, TOML files and validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the namespace data lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the data file and its backup
    pub data_dir: PathBuf,

    /// Data file name inside `data_dir`
    pub file_name: String,

    /// Directory for timestamped copies of the data file (disabled if unset)
    pub archive_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            file_name: "namespaces.json".to_string(),
            archive_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Full path of the data file
    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: NSFOREST_<SECTION>_<KEY>
    /// Example: NSFOREST_STORE_DATA_DIR=/var/lib/nsforest
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from any NSFOREST_* variables that are set
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Store config
        if let Ok(data_dir) = env::var("NSFOREST_STORE_DATA_DIR") {
            self.store.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(file_name) = env::var("NSFOREST_STORE_FILE_NAME") {
            self.store.file_name = file_name;
        }
        if let Ok(archive_dir) = env::var("NSFOREST_STORE_ARCHIVE_DIR") {
            self.store.archive_dir = if archive_dir.is_empty() {
                None
            } else {
                Some(PathBuf::from(archive_dir))
            };
        }

        // Logging config
        if let Ok(level) = env::var("NSFOREST_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Ok(json) = env::var("NSFOREST_LOG_JSON") {
            self.logging.json_format = json.parse().map_err(|_| ConfigError::Environment {
                var: "NSFOREST_LOG_JSON",
                value: json.clone(),
            })?;
        }

        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "data_dir must not be empty".to_string(),
            ));
        }

        let file_name = self.store.file_name.as_str();
        if file_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "file_name must not be empty".to_string(),
            ));
        }
        if file_name.contains('/') || file_name.contains('\\') || file_name == "." || file_name == ".."
        {
            return Err(ConfigError::Invalid(format!(
                "file_name must be a plain file name: {}",
                file_name
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
