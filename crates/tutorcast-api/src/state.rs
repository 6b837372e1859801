//! Application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tutorcast_auth::JwtManager;
use tutorcast_core::{LayoutService, RecordingService, UploadLimits};
use tutorcast_storage::{StorageConfig, StorageSet};

/// Handle used to render the Prometheus exposition
pub type MetricsHandle = PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub recordings: Arc<RecordingService>,
    pub layouts: Arc<LayoutService>,
    pub storage: StorageSet,
    pub storage_config: Arc<StorageConfig>,
    pub jwt: Arc<JwtManager>,
    pub auth_enabled: bool,
}

impl AppState {
    pub fn new(
        storage: StorageSet,
        storage_config: Arc<StorageConfig>,
        limits: UploadLimits,
        jwt: Arc<JwtManager>,
        auth_enabled: bool,
    ) -> Self {
        Self {
            recordings: Arc::new(RecordingService::new(storage.recordings.clone(), limits)),
            layouts: Arc::new(LayoutService::new(storage.layouts.clone())),
            storage,
            storage_config,
            jwt,
            auth_enabled,
        }
    }
}
