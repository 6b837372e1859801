//! Learner layout persistence

use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use tutorcast_storage::{StorageBackend, StorageObject};

use crate::artifact::{LayoutRole, layout_key};
use crate::error::CoreError;

pub struct LayoutService {
    storage: Arc<dyn StorageBackend>,
}

impl LayoutService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Store a layout as JSON, overwriting any previous one
    pub async fn save_layout(
        &self,
        user_id: &str,
        tutorial_id: &str,
        role: LayoutRole,
        layout: &Value,
    ) -> Result<String, CoreError> {
        let key = layout_key(user_id, tutorial_id, role)?;
        let object = StorageObject::new(serde_json::to_vec(layout)?).with_content_type("application/json");

        let location = self.storage.put(key.as_str(), object).await?;
        info!("Saved {} layout for user {} tutorial {}", role, user_id, tutorial_id);
        Ok(location)
    }

    /// The stored layout JSON, or `None` when nothing was saved yet
    pub async fn get_layout(
        &self,
        user_id: &str,
        tutorial_id: &str,
        role: LayoutRole,
    ) -> Result<Option<String>, CoreError> {
        let key = layout_key(user_id, tutorial_id, role)?;

        match self.storage.get(key.as_str()).await {
            Ok(object) => Ok(Some(String::from_utf8_lossy(&object.data).into_owned())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tutorcast_storage::{ErrorKind, LocalStorage};

    async fn create_service() -> (TempDir, LayoutService) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, LayoutService::new(Arc::new(storage)))
    }

    #[tokio::test]
    async fn test_save_and_get_layout() {
        let (dir, service) = create_service().await;
        let layout = json!({"panes": [{"id": "editor", "width": 60}]});

        service
            .save_layout("42", "tut-1", LayoutRole::Learner, &layout)
            .await
            .unwrap();
        assert!(dir.path().join("42/tut-1/learner/layout.json").exists());

        let stored = service
            .get_layout("42", "tut-1", LayoutRole::Learner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(serde_json::from_str::<Value>(&stored).unwrap(), layout);
    }

    #[tokio::test]
    async fn test_missing_layout_is_none() {
        let (_dir, service) = create_service().await;
        assert!(
            service
                .get_layout("42", "tut-1", LayoutRole::Author)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_roles_are_separate() {
        let (_dir, service) = create_service().await;
        service
            .save_layout("42", "tut-1", LayoutRole::Author, &json!({"a": 1}))
            .await
            .unwrap();

        assert!(
            service
                .get_layout("42", "tut-1", LayoutRole::Learner)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_rejects_traversal_in_ids() {
        let (_dir, service) = create_service().await;
        let err = service
            .save_layout("..", "tut-1", LayoutRole::Author, &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.storage_kind(), Some(ErrorKind::InvalidKey));
    }
}
