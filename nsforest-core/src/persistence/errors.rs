/*
    errors.rs - Error types for the persistence layer
*/

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File system operation failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document was written by an unknown format version
    #[error("Unsupported format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Two namespaces in the document share a case-insensitive name
    #[error(
        "Namespace with name \"{0}\" already exists. The name of a namespace must be unique (case-insensitive)."
    )]
    DuplicateName(String),

    /// Document structure is unusable
    #[error("Malformed namespace data: {0}")]
    Malformed(String),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    /// Adapter for `map_err` that attaches the path being accessed
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
        move |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
