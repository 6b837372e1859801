//! In-memory backend with fault injection and call counting, for tests

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use crate::backend::{StorageBackend, StorageObject};
use crate::error::{ErrorKind, StorageError};

/// Stores objects in a map and never validates keys, so tests can observe
/// whether a caller reached it at all.
#[derive(Default)]
pub(crate) struct FaultyBackend {
    objects: Mutex<BTreeMap<String, StorageObject>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failure: Mutex<Option<ErrorKind>>,
    failing_gets: Mutex<HashSet<String>>,
}

impl FaultyBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every operation fails with `kind`
    pub(crate) fn failing(kind: ErrorKind) -> Self {
        let backend = Self::default();
        backend.set_failure(Some(kind));
        backend
    }

    pub(crate) fn set_failure(&self, kind: Option<ErrorKind>) {
        *self.failure.lock().unwrap() = kind;
    }

    /// Only `get` on this key fails, with a transient error
    pub(crate) fn fail_get_for(&self, key: &str) {
        self.failing_gets.lock().unwrap().insert(key.to_string());
    }

    pub(crate) fn insert(&self, key: &str, data: &'static [u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), StorageObject::new(Bytes::from_static(data)));
    }

    pub(crate) fn data(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).map(|o| o.data.clone())
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn enter(&self, operation: &'static str, key: &str) -> Result<(), StorageError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;

        match *self.failure.lock().unwrap() {
            Some(ErrorKind::NotFound) => Err(StorageError::NotFound(key.to_string())),
            Some(ErrorKind::Transient) => Err(StorageError::Transient(format!("{} {}: connection refused", operation, key))),
            Some(ErrorKind::InvalidKey) => Err(StorageError::InvalidKey(key.to_string())),
            Some(ErrorKind::Fatal) => Err(StorageError::Fatal(format!("{} {}: access denied", operation, key))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StorageBackend for FaultyBackend {
    async fn put(&self, key: &str, object: StorageObject) -> Result<String, StorageError> {
        self.enter("put", key)?;
        self.objects.lock().unwrap().insert(key.to_string(), object);
        Ok(format!("memory://{}", key))
    }

    async fn get(&self, key: &str) -> Result<StorageObject, StorageError> {
        self.enter("get", key)?;
        if self.failing_gets.lock().unwrap().contains(key) {
            return Err(StorageError::Transient(format!("get {}: connection reset", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.enter("delete", key)?;
        Ok(self.objects.lock().unwrap().remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.enter("exists", key)?;
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.enter("list", prefix)?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
