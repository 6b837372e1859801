//! Storage backend trait

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::StorageError;

/// Payload passed through the backend interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub data: Bytes,
    /// Content type hint; backends fill it in on read
    pub content_type: Option<String>,
}

impl StorageObject {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The explicit content type, or one guessed from the key's extension
    pub fn content_type_for(&self, key: &str) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| guess_content_type(key))
    }
}

/// Guess a MIME type from a key's file extension
pub fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Prefix listed by health checks; nothing is ever stored under it
pub const HEALTH_CHECK_PREFIX: &str = "health-check-dummy/";

/// Reachability of one underlying store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentHealth {
    pub backend: &'static str,
    pub healthy: bool,
    pub error: Option<String>,
}

/// Storage backend trait
///
/// Keys are validated by every implementation before any I/O; an invalid key
/// always fails with [`StorageError::InvalidKey`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store an object, returning a backend-specific location string
    async fn put(&self, key: &str, object: StorageObject) -> Result<String, StorageError>;

    /// Read an object fully into memory
    async fn get(&self, key: &str) -> Result<StorageObject, StorageError>;

    /// Delete an object. Returns false if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys starting with `prefix`, in lexicographic order
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Short name of the backend ("local", "remote", "hybrid")
    fn backend_type(&self) -> &'static str;

    /// A URL clients can fetch the object from, if this backend hands them out
    async fn file_url(
        &self,
        _key: &str,
        _expires_in: Duration,
    ) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    /// List keys under `prefix` held by any underlying store, not just the
    /// authoritative one
    async fn list_all(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.list(prefix).await
    }

    /// Bytes stored on local disk, or None when the backend has no disk footprint
    async fn size_bytes(&self) -> Result<Option<u64>, StorageError> {
        Ok(None)
    }

    /// Check each underlying store directly, without any fallback
    async fn health(&self) -> Vec<ComponentHealth> {
        let error = self.list(HEALTH_CHECK_PREFIX).await.err().map(|e| e.to_string());
        vec![ComponentHealth {
            backend: self.backend_type(),
            healthy: error.is_none(),
            error,
        }]
    }
}

/// Compute SHA256 digest of data
pub fn compute_sha256(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("sha256:{}", hex::encode(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert!(guess_content_type("abc/recording.wav").starts_with("audio/"));
        assert_eq!(guess_content_type("abc/keystroke.json"), "application/json");
        assert_eq!(guess_content_type("abc/code_content.txt"), "text/plain");
        assert_eq!(guess_content_type("abc/noextension"), "application/octet-stream");
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let object = StorageObject::new(Bytes::from_static(b"# hi")).with_content_type("text/markdown");
        assert_eq!(object.content_type_for("abc/description.md"), "text/markdown");
        assert_eq!(object.len(), 4);
    }

    #[test]
    fn test_compute_sha256() {
        assert_eq!(
            compute_sha256(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
