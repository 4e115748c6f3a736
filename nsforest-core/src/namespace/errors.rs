/*
    errors.rs - Error types for namespace operations

    Every operation reports one of four kinds:
    - AlreadyExists
    - DoesNotExist
    - InvalidValue
    - StorageError (optionally flagged as inconsistent)
*/

use crate::persistence::{CommitFailure, CommitState, PersistenceError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Kind half of the (kind, message) pair returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    AlreadyExists,
    DoesNotExist,
    InvalidValue,
    StorageError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::DoesNotExist => "DoesNotExist",
            ErrorKind::InvalidValue => "InvalidValue",
            ErrorKind::StorageError => "StorageError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether memory still matches the backing store after a storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageState {
    /// Memory matches the last persisted state
    Consistent,
    /// Memory and disk have diverged; rollback could not complete
    Inconsistent,
}

impl fmt::Display for StorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageState::Consistent => f.write_str("consistent"),
            StorageState::Inconsistent => f.write_str("inconsistent"),
        }
    }
}

/// Errors returned by namespace store operations
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Does not exist: {0}")]
    DoesNotExist(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Storage error ({state}): {message}")]
    Storage { message: String, state: StorageState },
}

/// Result type for namespace operations
pub type NamespaceResult<T> = Result<T, NamespaceError>;

impl NamespaceError {
    pub(crate) fn namespace_missing(name: &str) -> Self {
        NamespaceError::DoesNotExist(format!("Namespace '{}' does not exist", name))
    }

    pub(crate) fn parent_missing(name: &str) -> Self {
        NamespaceError::DoesNotExist(format!("Parent namespace '{}' does not exist", name))
    }

    pub(crate) fn variable_missing(key: &str) -> Self {
        NamespaceError::DoesNotExist(format!("Variable with key '{}' does not exist", key))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NamespaceError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            NamespaceError::DoesNotExist(_) => ErrorKind::DoesNotExist,
            NamespaceError::InvalidValue(_) => ErrorKind::InvalidValue,
            NamespaceError::Storage { .. } => ErrorKind::StorageError,
        }
    }

    /// Message half of the (kind, message) pair
    pub fn message(&self) -> &str {
        match self {
            NamespaceError::AlreadyExists(msg)
            | NamespaceError::DoesNotExist(msg)
            | NamespaceError::InvalidValue(msg) => msg,
            NamespaceError::Storage { message, .. } => message,
        }
    }

    /// True when a failed commit also failed to roll back
    pub fn is_inconsistent(&self) -> bool {
        matches!(
            self,
            NamespaceError::Storage {
                state: StorageState::Inconsistent,
                ..
            }
        )
    }
}

impl From<PersistenceError> for NamespaceError {
    fn from(err: PersistenceError) -> Self {
        NamespaceError::Storage {
            message: err.to_string(),
            state: StorageState::Consistent,
        }
    }
}

impl From<CommitFailure> for NamespaceError {
    fn from(failure: CommitFailure) -> Self {
        let state = match failure.state {
            CommitState::Inconsistent => StorageState::Inconsistent,
            _ => StorageState::Consistent,
        };
        let mut message = format!(
            "Saving namespaces data to persistent storage failed: {}",
            failure.cause
        );
        if let Some(recovery) = &failure.recovery_error {
            message.push_str(&format!("; restoring the backup also failed: {}", recovery));
        } else if state == StorageState::Inconsistent {
            message.push_str("; no backup was available to restore");
        }
        NamespaceError::Storage { message, state }
    }
}
