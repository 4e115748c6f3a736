//! Configuration error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or written
    #[error("nsforest config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("nsforest config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("nsforest config could not be encoded as TOML: {0}")]
    Encode(#[from] toml::ser::Error),

    /// An NSFOREST_* variable held a value of the wrong type
    #[error("environment variable {var} has unusable value '{value}'")]
    Environment { var: &'static str, value: String },

    /// A field is out of range after all sources were applied
    #[error("invalid nsforest config: {0}")]
    Invalid(String),
}
