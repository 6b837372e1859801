//! API routes

mod auth;
mod files;
mod health;
mod layouts;
pub mod metrics;
mod recordings;
mod storage;
mod types;

use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

pub use auth::{RequireAuth, RequireAuthor};

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    // Recordings arrive base64 encoded inside form bodies
    let body_limit = usize::try_from(state.recordings.limits().max_bytes.saturating_mul(2)).unwrap_or(usize::MAX);

    let mut router = Router::new()
        .merge(health::routes())
        .merge(files::routes())
        .merge(recordings::routes())
        .merge(layouts::routes())
        .merge(storage::routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit));

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}
