//! Storage error types

use serde::Serialize;
use thiserror::Error;

/// Coarse classification every storage failure collapses into.
///
/// Callers outside this crate branch on the kind, never on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The key is absent at the queried backend
    NotFound,
    /// Network failure, timeout or unavailable service; safe to retry
    Transient,
    /// Traversal attempt or malformed segment, rejected before any I/O
    InvalidKey,
    /// Anything that will not get better by retrying
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transient => "transient",
            ErrorKind::InvalidKey => "invalid_key",
            ErrorKind::Fatal => "fatal",
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Storage backend unavailable: {0}")]
    Transient(String),

    #[error("Storage backend error: {0}")]
    Fatal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote read failed and the local retry failed too
    #[error("{local} (remote attempt failed first: {remote})")]
    Fallback {
        local: Box<StorageError>,
        remote: Box<StorageError>,
    },
}

impl StorageError {
    /// Classify this error into one of the four stable kinds.
    ///
    /// A failed fallback takes the kind of the local attempt, which was the
    /// last backend consulted.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::InvalidKey(_) => ErrorKind::InvalidKey,
            StorageError::Transient(_) => ErrorKind::Transient,
            StorageError::Io(_) | StorageError::Fatal(_) | StorageError::Configuration(_) => {
                ErrorKind::Fatal
            }
            StorageError::Fallback { local, .. } => local.kind(),
        }
    }

    pub(crate) fn fallback(local: StorageError, remote: StorageError) -> Self {
        StorageError::Fallback {
            local: Box::new(local),
            remote: Box::new(remote),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
