//! S3-compatible remote storage backend
//!
//! Uses the `object_store` crate, so AWS S3, MinIO and other S3-compatible
//! services all work. Every call is bounded by a timeout; an elapsed timeout is
//! reported as a transient failure.

use async_trait::async_trait;
use futures::TryStreamExt;
use http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::{StorageBackend, StorageObject, guess_content_type};
use crate::error::StorageError;
use crate::key::{StorageKey, validate_prefix};

/// Default bound on a single remote call
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote storage connection settings, shared by every bucket
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Bucket holding section recordings
    pub recordings_bucket: Option<String>,
    /// Bucket holding learner layouts
    pub layouts_bucket: Option<String>,
    /// S3 region (e.g., "us-east-1")
    pub region: String,
    /// Endpoint URL for MinIO or other S3-compatible services
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Prefix for all objects (optional)
    pub prefix: Option<String>,
    /// Allow HTTP (not HTTPS) connections
    pub allow_http: bool,
    /// Bound on each remote call
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            recordings_bucket: None,
            layouts_bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            prefix: None,
            allow_http: false,
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

/// Remote object storage backend
pub struct RemoteStorage {
    store: Arc<dyn ObjectStore>,
    /// Presigns download URLs; absent for stores that cannot sign
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
    prefix: String,
    timeout: Duration,
}

impl RemoteStorage {
    /// Connect to an S3 bucket
    pub fn new(bucket: &str, config: &RemoteConfig) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&config.region);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(access_key) = &config.access_key_id {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret_key);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = Arc::new(builder.build().map_err(|e| {
            StorageError::Configuration(format!("Failed to create S3 client: {}", e))
        })?);

        let mut storage = Self::with_store(
            store.clone(),
            bucket,
            config.prefix.as_deref(),
            config.timeout,
        );
        storage.signer = Some(store as Arc<dyn Signer>);

        info!(
            "Initialized remote storage: bucket={}, region={}, endpoint={:?}, prefix={}",
            bucket, config.region, config.endpoint, storage.prefix
        );

        Ok(storage)
    }

    /// Wrap an existing object store client
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: &str,
        prefix: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let prefix = prefix.unwrap_or_default().trim_matches('/').to_string();
        Self {
            store,
            signer: None,
            bucket: bucket.to_string(),
            prefix,
            timeout,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object path for a validated key
    fn object_path(&self, key: &StorageKey) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(key.as_str())
        } else {
            ObjectPath::from(format!("{}/{}", self.prefix, key))
        }
    }

    /// Run a store call under the configured timeout
    async fn bounded<T, F>(&self, operation: &str, key: &str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, object_store::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| map_store_error(e, key)),
            Err(_) => Err(StorageError::Transient(format!(
                "{} {} timed out after {:?}",
                operation, key, self.timeout
            ))),
        }
    }

    fn strip_prefix<'a>(&self, location: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            Some(location)
        } else {
            location
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
        }
    }
}

/// Translate object store errors into the storage taxonomy.
///
/// Only a missing-object response is `NotFound`. Network and service failures
/// are `Transient`. Credential and configuration problems are fatal.
fn map_store_error(err: object_store::Error, key: &str) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
        object_store::Error::InvalidPath { source } => {
            StorageError::InvalidKey(format!("{}: {}", key, source))
        }
        object_store::Error::PermissionDenied { .. }
        | object_store::Error::Unauthenticated { .. }
        | object_store::Error::UnknownConfigurationKey { .. }
        | object_store::Error::NotSupported { .. }
        | object_store::Error::NotImplemented => StorageError::Fatal(err.to_string()),
        other => StorageError::Transient(other.to_string()),
    }
}

#[async_trait]
impl StorageBackend for RemoteStorage {
    async fn put(&self, key: &str, object: StorageObject) -> Result<String, StorageError> {
        let key = StorageKey::parse(key)?;
        let path = self.object_path(&key);
        debug!("Writing {} bytes to S3: {:?}", object.len(), path);

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            object.content_type_for(key.as_str()).into(),
        );
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.bounded(
            "put",
            key.as_str(),
            self.store.put_opts(&path, PutPayload::from(object.data), options),
        )
        .await?;

        Ok(format!("s3://{}/{}", self.bucket, path))
    }

    async fn get(&self, key: &str) -> Result<StorageObject, StorageError> {
        let key = StorageKey::parse(key)?;
        let path = self.object_path(&key);
        debug!("Reading object from S3: {:?}", path);

        let result = self.bounded("get", key.as_str(), self.store.get(&path)).await?;
        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.as_ref().to_string())
            .unwrap_or_else(|| guess_content_type(key.as_str()));
        let data = self.bounded("get", key.as_str(), result.bytes()).await?;

        Ok(StorageObject {
            data,
            content_type: Some(content_type),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let key = StorageKey::parse(key)?;
        let path = self.object_path(&key);
        debug!("Deleting object from S3: {:?}", path);

        // S3 deletes succeed on missing keys, so check first
        if !self.exists(key.as_str()).await? {
            return Ok(false);
        }

        self.bounded("delete", key.as_str(), self.store.delete(&path))
            .await?;
        Ok(true)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let key = StorageKey::parse(key)?;
        let path = self.object_path(&key);

        match self.bounded("head", key.as_str(), self.store.head(&path)).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;

        // object_store lists whole path segments, so query the deepest
        // directory the prefix names and filter the rest by string prefix
        let directory = prefix.rsplit_once('/').map(|(dirs, _)| dirs).unwrap_or("");
        let query = match (self.prefix.is_empty(), directory.is_empty()) {
            (true, true) => None,
            (true, false) => Some(ObjectPath::from(directory)),
            (false, true) => Some(ObjectPath::from(self.prefix.as_str())),
            (false, false) => Some(ObjectPath::from(format!("{}/{}", self.prefix, directory))),
        };
        debug!("Listing S3 objects under {:?} matching {:?}", query, prefix);

        let objects = self
            .bounded(
                "list",
                prefix,
                self.store.list(query.as_ref()).try_collect::<Vec<_>>(),
            )
            .await
            .map_err(|e| match e {
                // A listing never reports a missing object; treat it as unavailability
                StorageError::NotFound(detail) => StorageError::Transient(detail),
                other => other,
            })?;

        let mut keys: Vec<String> = objects
            .iter()
            .filter_map(|meta| self.strip_prefix(meta.location.as_ref()))
            .filter(|key| key.starts_with(prefix))
            .map(str::to_string)
            .collect();
        keys.sort();

        Ok(keys)
    }

    fn backend_type(&self) -> &'static str {
        "remote"
    }

    /// Presigned GET URL; the object is not checked for existence
    async fn file_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<Option<String>, StorageError> {
        let key = StorageKey::parse(key)?;
        let Some(signer) = &self.signer else {
            return Ok(None);
        };
        let path = self.object_path(&key);

        let url = self
            .bounded(
                "sign",
                key.as_str(),
                signer.signed_url(Method::GET, &path, expires_in),
            )
            .await?;
        Ok(Some(url.to_string()))
    }
}
