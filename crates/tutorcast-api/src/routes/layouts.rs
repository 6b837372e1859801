//! Learner layout routes

use axum::{Json, Router, extract::State, routing::post};
use tracing::debug;
use tutorcast_core::LayoutRole;

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::RequireAuth;
use super::types::{GetLayoutRequest, LayoutResponse, MessageResponse, SaveLayoutRequest, require_non_empty};

/// POST /save_learner_layout (Authenticated)
async fn save_learner_layout(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<SaveLayoutRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = require_non_empty("userid", request.userid.into_string())?;
    let tutorial_id = require_non_empty("tutorialid", request.tutorialid.into_string())?;
    let role: LayoutRole = request.role.parse()?;

    debug!(
        "User {} saving {} layout of user {} for tutorial {}",
        user.id, role, user_id, tutorial_id
    );

    state
        .layouts
        .save_layout(&user_id, &tutorial_id, role, &request.layout)
        .await?;

    Ok(Json(MessageResponse::success()))
}

/// POST /get_learner_layout (Authenticated)
async fn get_learner_layout(
    _auth: RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<GetLayoutRequest>,
) -> Result<Json<LayoutResponse>, ApiError> {
    let user_id = require_non_empty("userid", request.userid.into_string())?;
    let tutorial_id = require_non_empty("tutorialid", request.tutorialid.into_string())?;
    let role: LayoutRole = request.role.parse()?;

    let layout = state.layouts.get_layout(&user_id, &tutorial_id, role).await?;
    Ok(Json(LayoutResponse { layout }))
}

/// Create layout routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/save_learner_layout", post(save_learner_layout))
        .route("/get_learner_layout", post(get_learner_layout))
}
