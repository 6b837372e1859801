//! Liveness endpoints
//!
//! These never touch storage; `/api/storage/health` does that.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Configured storage mode
    pub storage_type: String,
    pub auth_enabled: bool,
}

async fn liveness(State(state): State<AppState>) -> Json<LivenessResponse> {
    let storage_type = state.storage_config.mode.to_string();
    metrics::counter!("tutorcast_liveness_checks_total", "storage_type" => storage_type.clone())
        .increment(1);

    Json(LivenessResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage_type,
        auth_enabled: state.auth_enabled,
    })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(liveness))
        .route("/healthz", get(liveness))
}
