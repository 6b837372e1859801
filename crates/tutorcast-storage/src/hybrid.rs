//! Hybrid storage backend
//!
//! Composes a remote and a local backend. The remote is authoritative: reads
//! try it first and fall back to local when it is unreachable or lacks the
//! object, writes land on it first and are mirrored to local on a best-effort
//! basis.

use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{ComponentHealth, StorageBackend, StorageObject};
use crate::error::{ErrorKind, StorageError};
use crate::key::{StorageKey, validate_prefix};

pub struct HybridStorage {
    local: Arc<dyn StorageBackend>,
    remote: Arc<dyn StorageBackend>,
}

impl HybridStorage {
    pub fn new(local: Arc<dyn StorageBackend>, remote: Arc<dyn StorageBackend>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &Arc<dyn StorageBackend> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn StorageBackend> {
        &self.remote
    }

    /// Only a missing object or an unreachable remote sends a read to local.
    /// Fatal and invalid-key failures propagate as-is.
    fn should_fall_back(err: &StorageError) -> bool {
        matches!(err.kind(), ErrorKind::Transient | ErrorKind::NotFound)
    }

    fn record_fallback(operation: &'static str, target: &str, err: &StorageError) {
        counter!("tutorcast_storage_fallback_total", "operation" => operation).increment(1);
        if err.kind() == ErrorKind::Transient {
            warn!("Remote {} failed for {}, falling back to local: {}", operation, target, err);
        } else {
            debug!("Remote {} missed {}, trying local", operation, target);
        }
    }

    fn record_mirror_failure(operation: &'static str, key: &str, err: &StorageError) {
        counter!("tutorcast_storage_mirror_failures_total", "operation" => operation).increment(1);
        warn!("Local mirror {} failed for {}: {}", operation, key, err);
    }
}

#[async_trait]
impl StorageBackend for HybridStorage {
    async fn put(&self, key: &str, object: StorageObject) -> Result<String, StorageError> {
        StorageKey::parse(key)?;

        let location = self.remote.put(key, object.clone()).await?;

        if let Err(e) = self.local.put(key, object).await {
            Self::record_mirror_failure("put", key, &e);
        }

        Ok(location)
    }

    async fn get(&self, key: &str) -> Result<StorageObject, StorageError> {
        StorageKey::parse(key)?;

        match self.remote.get(key).await {
            Ok(object) => Ok(object),
            Err(remote_err) if Self::should_fall_back(&remote_err) => {
                Self::record_fallback("get", key, &remote_err);
                self.local
                    .get(key)
                    .await
                    .map_err(|local_err| StorageError::fallback(local_err, remote_err))
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        StorageKey::parse(key)?;

        let deleted = self.remote.delete(key).await?;

        if let Err(e) = self.local.delete(key).await {
            Self::record_mirror_failure("delete", key, &e);
        }

        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        StorageKey::parse(key)?;

        match self.remote.exists(key).await {
            Ok(found) => Ok(found),
            Err(remote_err) if Self::should_fall_back(&remote_err) => {
                Self::record_fallback("exists", key, &remote_err);
                self.local
                    .exists(key)
                    .await
                    .map_err(|local_err| StorageError::fallback(local_err, remote_err))
            }
            Err(e) => Err(e),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;

        match self.remote.list(prefix).await {
            Ok(keys) => Ok(keys),
            Err(remote_err) if Self::should_fall_back(&remote_err) => {
                Self::record_fallback("list", prefix, &remote_err);
                self.local
                    .list(prefix)
                    .await
                    .map_err(|local_err| StorageError::fallback(local_err, remote_err))
            }
            Err(e) => Err(e),
        }
    }

    fn backend_type(&self) -> &'static str {
        "hybrid"
    }

    /// Prefer a remote URL; local files are served when the remote cannot
    /// produce one
    async fn file_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<Option<String>, StorageError> {
        StorageKey::parse(key)?;

        match self.remote.file_url(key, expires_in).await {
            Ok(Some(url)) => Ok(Some(url)),
            Ok(None) => self.local.file_url(key, expires_in).await,
            Err(remote_err) if Self::should_fall_back(&remote_err) => {
                Self::record_fallback("file_url", key, &remote_err);
                self.local
                    .file_url(key, expires_in)
                    .await
                    .map_err(|local_err| StorageError::fallback(local_err, remote_err))
            }
            Err(e) => Err(e),
        }
    }

    /// Union of both listings, so objects only the mirror holds are included.
    /// A failing local listing degrades to the remote keys alone.
    async fn list_all(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = self.list(prefix).await?;

        match self.local.list(prefix).await {
            Ok(local_keys) => keys.extend(local_keys),
            Err(e) => warn!("Local listing of {:?} failed: {}", prefix, e),
        }
        keys.sort();
        keys.dedup();

        Ok(keys)
    }

    async fn size_bytes(&self) -> Result<Option<u64>, StorageError> {
        self.local.size_bytes().await
    }

    async fn health(&self) -> Vec<ComponentHealth> {
        let mut components = self.remote.health().await;
        components.extend(self.local.health().await);
        components
    }
}
