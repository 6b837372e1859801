//! Storage diagnostics routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use tracing::warn;
use tutorcast_storage::{ComponentHealth, StorageNamespace};

use crate::state::AppState;

use super::types::{BackendHealth, NamespaceInfo, StorageHealthResponse, StorageInfoResponse};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Whether every remote component answered, or None without one
fn remote_accessible(components: &[ComponentHealth]) -> Option<bool> {
    let mut remotes = components.iter().filter(|c| c.backend == "remote").peekable();
    remotes.peek()?;
    Some(remotes.all(|c| c.healthy))
}

async fn namespace_info(state: &AppState, namespace: StorageNamespace) -> NamespaceInfo {
    let config = &state.storage_config;
    let backend = state.storage.get(namespace);

    let size_bytes = match backend.size_bytes().await {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not measure {} storage: {}", namespace, e);
            None
        }
    };

    NamespaceInfo {
        backend: backend.backend_type().to_string(),
        local_path: config.local_path(namespace).display().to_string(),
        bucket: config.bucket(namespace).map(str::to_string),
        size_bytes,
        accessible: remote_accessible(&backend.health().await),
    }
}

/// Combined size in MiB, rounded to two decimals
fn total_size_mb(namespaces: &[&NamespaceInfo]) -> Option<f64> {
    let sizes: Vec<u64> = namespaces.iter().filter_map(|n| n.size_bytes).collect();
    if sizes.is_empty() {
        return None;
    }
    let mb = sizes.iter().sum::<u64>() as f64 / BYTES_PER_MB;
    Some((mb * 100.0).round() / 100.0)
}

/// GET /api/storage/info
async fn storage_info(State(state): State<AppState>) -> Json<StorageInfoResponse> {
    let recordings = namespace_info(&state, StorageNamespace::Recordings).await;
    let layouts = namespace_info(&state, StorageNamespace::Layouts).await;
    let config = &state.storage_config;

    Json(StorageInfoResponse {
        storage_type: config.mode.to_string(),
        total_size_mb: total_size_mb(&[&recordings, &layouts]),
        recordings,
        layouts,
        region: config.remote.region.clone(),
        endpoint: config.remote.endpoint.clone(),
    })
}

/// GET /api/storage/health
///
/// Every store behind each namespace is checked on its own, so a remote
/// outage shows up even while reads are served from the local mirror. Any
/// failing store answers 503; the status is "degraded" while every namespace
/// still has a working store.
async fn storage_health(State(state): State<AppState>) -> (StatusCode, Json<StorageHealthResponse>) {
    let mut backends = Vec::new();
    let mut serving = true;

    for namespace in StorageNamespace::ALL {
        let components = state.storage.get(namespace).health().await;
        serving &= components.iter().any(|c| c.healthy);

        for component in components {
            if let Some(error) = &component.error {
                warn!(
                    "Storage health check failed for {} ({}): {}",
                    namespace, component.backend, error
                );
            }
            backends.push(BackendHealth {
                namespace: namespace.to_string(),
                backend: component.backend.to_string(),
                healthy: component.healthy,
                error: component.error,
            });
        }
    }

    let (status, label) = if backends.iter().all(|b| b.healthy) {
        (StatusCode::OK, "healthy")
    } else if serving {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status,
        Json(StorageHealthResponse {
            status: label.to_string(),
            storage_type: state.storage_config.mode.to_string(),
            backends,
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}

/// Create storage routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/storage/info", get(storage_info))
        .route("/api/storage/health", get(storage_health))
}
