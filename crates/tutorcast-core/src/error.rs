//! Core error types

use thiserror::Error;
use tutorcast_storage::{ErrorKind, StorageError};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Storage error kind, when this error came from a backend
    pub fn storage_kind(&self) -> Option<ErrorKind> {
        match self {
            CoreError::Storage(e) => Some(e.kind()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::NotFound(_) => true,
            CoreError::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }
}
