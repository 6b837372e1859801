//! Local disk storage backend

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{StorageBackend, StorageObject, guess_content_type};
use crate::error::StorageError;
use crate::key::{StorageKey, validate_prefix};

/// Whether an io error means the path names nothing. A file standing where a
/// directory segment is expected counts as missing.
fn is_missing(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory)
}

/// Local disk storage backend
///
/// Objects live at `<root>/<key>`, one file per key.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend, creating the root if needed
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        fs::create_dir_all(root).await?;
        let root = fs::canonicalize(root).await?;

        info!("Initialized local storage at {:?}", root);

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a validated key to a path inside the root
    fn object_path(&self, key: &StorageKey) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for segment in key.segments() {
            path.push(segment);
        }

        if !path.starts_with(&self.root) {
            return Err(StorageError::InvalidKey(format!(
                "{} resolves outside the storage root",
                key
            )));
        }
        Ok(path)
    }

    /// Remove empty directories between `start` and the root
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut dir = start.to_path_buf();
        while dir != self.root && dir.starts_with(&self.root) {
            // Fails on non-empty directories, which ends the walk
            if fs::remove_dir(&dir).await.is_err() {
                break;
            }
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
    }

    /// Walk the tree under `start`, collecting keys relative to the root
    async fn collect_keys(&self, start: PathBuf, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut pending = vec![start];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if is_missing(&e) => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                // Temp files from in-flight writes
                if name.starts_with('.') {
                    continue;
                }

                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file()
                    && let Some(key) = self.relative_key(&entry.path())
                    && key.starts_with(prefix)
                {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn relative_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(segments.join("/"))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, key: &str, object: StorageObject) -> Result<String, StorageError> {
        let key = StorageKey::parse(key)?;
        let path = self.object_path(&key)?;
        debug!("Writing {} bytes to {:?}", object.len(), path);

        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).await?;

        // Write to a hidden temp file, then rename into place
        let temp_path = parent.join(format!(".{}.{}.tmp", key.file_name(), Uuid::new_v4()));
        if let Err(e) = fs::write(&temp_path, &object.data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }

        Ok(path.to_string_lossy().to_string())
    }

    async fn get(&self, key: &str) -> Result<StorageObject, StorageError> {
        let key = StorageKey::parse(key)?;
        let path = self.object_path(&key)?;
        debug!("Reading object from {:?}", path);

        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(StorageError::NotFound(key.to_string())),
            Err(e) if is_missing(&e) => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        }

        let data = fs::read(&path).await.map_err(|e| {
            if is_missing(&e) {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        Ok(StorageObject {
            data: Bytes::from(data),
            content_type: Some(guess_content_type(key.as_str())),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let key = StorageKey::parse(key)?;
        let path = self.object_path(&key)?;
        debug!("Deleting object at {:?}", path);

        match fs::remove_file(&path).await {
            Ok(()) => {
                if let Some(parent) = path.parent() {
                    self.prune_empty_dirs(parent).await;
                }
                Ok(true)
            }
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => {
                warn!("Failed to delete {:?}: {}", path, e);
                Err(StorageError::Io(e))
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let key = StorageKey::parse(key)?;
        let path = self.object_path(&key)?;

        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;

        // Start from the deepest directory the prefix fully names
        let mut start = self.root.clone();
        if let Some((dirs, _)) = prefix.rsplit_once('/') {
            for segment in dirs.split('/') {
                start.push(segment);
            }
        }
        debug!("Listing {:?} under {:?}", prefix, start);

        self.collect_keys(start, prefix).await
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }

    /// Files on disk are served back through the files API
    async fn file_url(
        &self,
        key: &str,
        _expires_in: Duration,
    ) -> Result<Option<String>, StorageError> {
        if !self.exists(key).await? {
            return Ok(None);
        }
        Ok(Some(format!("/api/files/{}", key)))
    }

    async fn size_bytes(&self) -> Result<Option<u64>, StorageError> {
        let mut total = 0;
        for key in self.collect_keys(self.root.clone(), "").await? {
            match fs::metadata(self.root.join(&key)).await {
                Ok(metadata) => total += metadata.len(),
                // Deleted since the walk
                Err(e) if is_missing(&e) => {}
                Err(e) => return Err(StorageError::Io(e)),
            }
        }
        Ok(Some(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    async fn create_storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (_dir, storage) = create_storage().await;
        let payload = Bytes::from_static(b"RIFF....WAVEfmt ");

        let location = storage
            .put("abc/recording.wav", StorageObject::new(payload.clone()))
            .await
            .unwrap();
        assert!(location.ends_with("abc/recording.wav"));

        let object = storage.get("abc/recording.wav").await.unwrap();
        assert_eq!(object.data, payload);
        assert!(object.content_type.unwrap().starts_with("audio/"));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_dir, storage) = create_storage().await;
        storage.put("abc/keystroke.json", StorageObject::new("[1]")).await.unwrap();
        storage.put("abc/keystroke.json", StorageObject::new("[1,2]")).await.unwrap();

        let object = storage.get("abc/keystroke.json").await.unwrap();
        assert_eq!(object.data, Bytes::from_static(b"[1,2]"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, storage) = create_storage().await;
        let err = storage.get("abc/recording.wav").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // A directory is not an object
        storage.put("abc/def/x.txt", StorageObject::new("x")).await.unwrap();
        let err = storage.get("abc/def").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_file_in_directory_position_is_not_found() {
        let (_dir, storage) = create_storage().await;
        storage.put("abc", StorageObject::new("x")).await.unwrap();

        let err = storage.get("abc/recording.wav").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!storage.exists("abc/recording.wav").await.unwrap());
        assert!(!storage.delete("abc/recording.wav").await.unwrap());
        assert!(storage.list("abc/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_url() {
        let (_dir, storage) = create_storage().await;
        storage.put("abc/recording.wav", StorageObject::new("x")).await.unwrap();

        let expires = Duration::from_secs(3600);
        assert_eq!(
            storage.file_url("abc/recording.wav", expires).await.unwrap().as_deref(),
            Some("/api/files/abc/recording.wav")
        );
        assert_eq!(storage.file_url("abc/keystroke.json", expires).await.unwrap(), None);
        assert_eq!(
            storage.file_url("../x", expires).await.unwrap_err().kind(),
            ErrorKind::InvalidKey
        );
    }

    #[tokio::test]
    async fn test_size_bytes() {
        let (dir, storage) = create_storage().await;
        assert_eq!(storage.size_bytes().await.unwrap(), Some(0));

        storage.put("abc/recording.wav", StorageObject::new("12345")).await.unwrap();
        storage.put("7/tut/learner/layout.json", StorageObject::new("{}")).await.unwrap();
        std::fs::write(dir.path().join("abc").join(".partial.tmp"), b"ignored").unwrap();

        assert_eq!(storage.size_bytes().await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (dir, storage) = create_storage().await;
        storage.put("abc/recording.wav", StorageObject::new("x")).await.unwrap();

        assert!(storage.delete("abc/recording.wav").await.unwrap());
        assert!(!storage.delete("abc/recording.wav").await.unwrap());
        assert!(!storage.exists("abc/recording.wav").await.unwrap());
        // Empty section directory is pruned, root is kept
        assert!(!dir.path().join("abc").exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let (_dir, storage) = create_storage().await;
        storage.put("abc/recording.wav", StorageObject::new("x")).await.unwrap();

        assert_eq!(storage.list("abc/").await.unwrap(), vec!["abc/recording.wav"]);
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_recursive() {
        let (_dir, storage) = create_storage().await;
        for key in [
            "s2/transcript.json",
            "s1/keystroke.json",
            "s1/consoleAction.json",
            "7/tut/learner/layout.json",
            "s10/recording.wav",
        ] {
            storage.put(key, StorageObject::new("x")).await.unwrap();
        }

        assert_eq!(
            storage.list("").await.unwrap(),
            vec![
                "7/tut/learner/layout.json",
                "s1/consoleAction.json",
                "s1/keystroke.json",
                "s10/recording.wav",
                "s2/transcript.json",
            ]
        );
        assert_eq!(storage.list("s1/").await.unwrap(), vec!["s1/consoleAction.json", "s1/keystroke.json"]);
        assert_eq!(storage.list("s1").await.unwrap().len(), 3);
        assert_eq!(storage.list("s1/key").await.unwrap(), vec!["s1/keystroke.json"]);
        assert!(storage.list("missing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_traversal_before_io() {
        let (dir, storage) = create_storage().await;
        let outside = dir.path().parent().unwrap().join("escaped.txt");

        let err = storage
            .put("../escaped.txt", StorageObject::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
        assert!(!outside.exists());

        assert_eq!(storage.get("abc/../../etc/passwd").await.unwrap_err().kind(), ErrorKind::InvalidKey);
        assert_eq!(storage.delete("..").await.unwrap_err().kind(), ErrorKind::InvalidKey);
        assert_eq!(storage.exists("abc/..").await.unwrap_err().kind(), ErrorKind::InvalidKey);
        assert_eq!(storage.list("../").await.unwrap_err().kind(), ErrorKind::InvalidKey);
    }

    #[tokio::test]
    async fn test_temp_files_are_hidden() {
        let (dir, storage) = create_storage().await;
        storage.put("abc/recording.wav", StorageObject::new("x")).await.unwrap();
        std::fs::write(dir.path().join("abc").join(".recording.wav.partial.tmp"), b"x").unwrap();

        assert_eq!(storage.list("abc/").await.unwrap(), vec!["abc/recording.wav"]);
    }
}
