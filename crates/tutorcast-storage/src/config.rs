//! Storage mode selection and backend construction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::hybrid::HybridStorage;
use crate::local::LocalStorage;
use crate::remote::{RemoteConfig, RemoteStorage};

/// Process-wide storage mode, read once at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Local,
    #[serde(alias = "s3")]
    Remote,
    #[default]
    Auto,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Local => "local",
            StorageMode::Remote => "remote",
            StorageMode::Auto => "auto",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageMode::Local),
            "s3" | "remote" => Ok(StorageMode::Remote),
            "auto" => Ok(StorageMode::Auto),
            other => Err(StorageError::Configuration(format!(
                "unknown storage type {:?}, expected local, s3, remote or auto",
                other
            ))),
        }
    }
}

/// Which family of objects a backend holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageNamespace {
    /// Section artifacts, keyed `<sectionId>/<artifactName>`
    Recordings,
    /// Learner layouts, keyed `<userId>/<tutorialId>/<role>/layout.json`
    Layouts,
}

impl StorageNamespace {
    pub const ALL: [StorageNamespace; 2] = [StorageNamespace::Recordings, StorageNamespace::Layouts];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageNamespace::Recordings => "recordings",
            StorageNamespace::Layouts => "layouts",
        }
    }
}

impl fmt::Display for StorageNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local storage roots
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub recordings_path: PathBuf,
    pub layouts_path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            recordings_path: PathBuf::from("storage/recordings"),
            layouts_path: PathBuf::from("storage/layouts"),
        }
    }
}

/// Resolved storage configuration.
///
/// Built once at startup and handed by reference to every constructor.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub mode: StorageMode,
    pub local: LocalConfig,
    pub remote: RemoteConfig,
}

impl StorageConfig {
    pub fn local_path(&self, namespace: StorageNamespace) -> &Path {
        match namespace {
            StorageNamespace::Recordings => &self.local.recordings_path,
            StorageNamespace::Layouts => &self.local.layouts_path,
        }
    }

    pub fn bucket(&self, namespace: StorageNamespace) -> Option<&str> {
        let bucket = match namespace {
            StorageNamespace::Recordings => self.remote.recordings_bucket.as_deref(),
            StorageNamespace::Layouts => self.remote.layouts_bucket.as_deref(),
        };
        bucket.filter(|b| !b.trim().is_empty())
    }

    pub async fn build_local(&self, namespace: StorageNamespace) -> Result<LocalStorage, StorageError> {
        LocalStorage::new(self.local_path(namespace)).await
    }

    /// The remote backend for `namespace`, or `None` when no bucket is configured
    pub fn build_remote(&self, namespace: StorageNamespace) -> Result<Option<RemoteStorage>, StorageError> {
        self.bucket(namespace)
            .map(|bucket| RemoteStorage::new(bucket, &self.remote))
            .transpose()
    }
}

/// Build the backend the configured mode calls for.
///
/// `Auto` without a bucket degrades to local-only with a warning. `Remote`
/// without a bucket is a configuration error.
pub async fn build_backend(
    config: &StorageConfig,
    namespace: StorageNamespace,
) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let backend: Arc<dyn StorageBackend> = match config.mode {
        StorageMode::Local => Arc::new(config.build_local(namespace).await?),
        StorageMode::Remote => {
            let remote = config.build_remote(namespace)?.ok_or_else(|| {
                StorageError::Configuration(format!(
                    "storage type is remote but no bucket is configured for {}",
                    namespace
                ))
            })?;
            Arc::new(remote)
        }
        StorageMode::Auto => {
            let local = config.build_local(namespace).await?;
            match config.build_remote(namespace)? {
                Some(remote) => Arc::new(HybridStorage::new(Arc::new(local), Arc::new(remote))),
                None => {
                    warn!(
                        "No bucket configured for {}, auto mode is using local storage only",
                        namespace
                    );
                    Arc::new(local)
                }
            }
        }
    };

    info!(
        "Storage for {}: mode={}, backend={}",
        namespace,
        config.mode,
        backend.backend_type()
    );

    Ok(backend)
}

/// One backend per namespace
#[derive(Clone)]
pub struct StorageSet {
    pub recordings: Arc<dyn StorageBackend>,
    pub layouts: Arc<dyn StorageBackend>,
}

impl StorageSet {
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(Self {
            recordings: build_backend(config, StorageNamespace::Recordings).await?,
            layouts: build_backend(config, StorageNamespace::Layouts).await?,
        })
    }

    pub fn get(&self, namespace: StorageNamespace) -> &Arc<dyn StorageBackend> {
        match namespace {
            StorageNamespace::Recordings => &self.recordings,
            StorageNamespace::Layouts => &self.layouts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StorageObject;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn local_config(dir: &TempDir, mode: StorageMode) -> StorageConfig {
        StorageConfig {
            mode,
            local: LocalConfig {
                recordings_path: dir.path().join("recordings"),
                layouts_path: dir.path().join("layouts"),
            },
            remote: RemoteConfig::default(),
        }
    }

    #[test]
    fn test_parse_storage_mode() {
        assert_eq!("local".parse::<StorageMode>().unwrap(), StorageMode::Local);
        assert_eq!("S3".parse::<StorageMode>().unwrap(), StorageMode::Remote);
        assert_eq!("remote".parse::<StorageMode>().unwrap(), StorageMode::Remote);
        assert_eq!(" Auto ".parse::<StorageMode>().unwrap(), StorageMode::Auto);
        assert_eq!("gcs".parse::<StorageMode>().unwrap_err().kind(), ErrorKind::Fatal);
        assert_eq!(StorageMode::default(), StorageMode::Auto);
    }

    #[test]
    fn test_deserialize_storage_mode() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: StorageMode,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"mode":"s3"}"#).unwrap();
        assert_eq!(parsed.mode, StorageMode::Remote);
        let parsed: Wrapper = serde_json::from_str(r#"{"mode":"local"}"#).unwrap();
        assert_eq!(parsed.mode, StorageMode::Local);
    }

    #[tokio::test]
    async fn test_local_mode_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = local_config(&dir, StorageMode::Local);
        let backend = build_backend(&config, StorageNamespace::Recordings).await.unwrap();
        assert_eq!(backend.backend_type(), "local");

        backend
            .put("abc/recording.wav", StorageObject::new("RIFF"))
            .await
            .unwrap();
        assert_eq!(backend.get("abc/recording.wav").await.unwrap().data, "RIFF".as_bytes());
        assert_eq!(backend.list("abc/").await.unwrap(), vec!["abc/recording.wav"]);
        assert!(dir.path().join("recordings/abc/recording.wav").exists());
    }

    #[tokio::test]
    async fn test_auto_without_bucket_is_local_only() {
        let dir = TempDir::new().unwrap();
        let config = local_config(&dir, StorageMode::Auto);
        let set = StorageSet::from_config(&config).await.unwrap();
        assert_eq!(set.recordings.backend_type(), "local");
        assert_eq!(set.get(StorageNamespace::Layouts).backend_type(), "local");
    }

    #[tokio::test]
    async fn test_remote_without_bucket_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir, StorageMode::Remote);
        config.remote.recordings_bucket = Some("  ".to_string());

        let err = build_backend(&config, StorageNamespace::Recordings)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[tokio::test]
    async fn test_auto_with_bucket_is_hybrid() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir, StorageMode::Auto);
        config.remote.recordings_bucket = Some("tutorial-recordings".to_string());
        config.remote.access_key_id = Some("test".to_string());
        config.remote.secret_access_key = Some("test".to_string());
        config.remote.endpoint = Some("http://localhost:9000".to_string());
        config.remote.allow_http = true;

        let set = StorageSet::from_config(&config).await.unwrap();
        assert_eq!(set.recordings.backend_type(), "hybrid");
        assert_eq!(set.layouts.backend_type(), "local");
    }
}
