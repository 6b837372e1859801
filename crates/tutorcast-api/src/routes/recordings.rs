//! Section recording routes

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use tracing::info;
use tutorcast_core::RecordingUpload;

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::RequireAuthor;
use super::types::{
    CopySectionResponse, DeleteSectionResponse, SearchResponse, SectionFilesResponse,
    UploadRecordingResponse,
};

/// POST /upload_recording (Author only)
async fn upload_recording(
    RequireAuthor(user): RequireAuthor,
    State(state): State<AppState>,
    Form(upload): Form<RecordingUpload>,
) -> Result<Json<UploadRecordingResponse>, ApiError> {
    info!(
        "User {} saving recording for section {}",
        user.id, upload.tutorial_section_id
    );

    let files = state.recordings.upload_recording(upload).await?;

    Ok(Json(UploadRecordingResponse {
        message: "success".to_string(),
        files,
    }))
}

/// GET /api/recordings/{section_id}
async fn list_section(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
) -> Result<Json<SectionFilesResponse>, ApiError> {
    let files = state.recordings.list_artifacts(&section_id).await?;
    Ok(Json(SectionFilesResponse { section_id, files }))
}

/// DELETE /api/recordings/{section_id} (Author only)
async fn delete_section(
    RequireAuthor(user): RequireAuthor,
    State(state): State<AppState>,
    Path(section_id): Path<String>,
) -> Result<Json<DeleteSectionResponse>, ApiError> {
    info!("User {} deleting section {}", user.id, section_id);

    let deleted = state.recordings.delete_section(&section_id).await?;
    Ok(Json(DeleteSectionResponse { deleted }))
}

/// POST /api/recordings/{source}/copy/{destination} (Author only)
async fn copy_section(
    RequireAuthor(user): RequireAuthor,
    State(state): State<AppState>,
    Path((source, destination)): Path<(String, String)>,
) -> Result<Json<CopySectionResponse>, ApiError> {
    info!("User {} copying section {} to {}", user.id, source, destination);

    let copied = state.recordings.copy_section(&source, &destination).await?;
    Ok(Json(CopySectionResponse { copied }))
}

/// GET /tutorial_section/search/keyword/{keyword}/{section_id}
async fn search_keyword(
    State(state): State<AppState>,
    Path((keyword, section_id)): Path<(String, String)>,
) -> Result<Json<SearchResponse>, ApiError> {
    let result = state.recordings.search_transcript(&section_id, &keyword).await?;
    Ok(Json(SearchResponse { result }))
}

/// Create recording routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload_recording", post(upload_recording))
        .route("/api/recordings/{section_id}", get(list_section).delete(delete_section))
        .route("/api/recordings/{source}/copy/{destination}", post(copy_section))
        .route(
            "/tutorial_section/search/keyword/{keyword}/{section_id}",
            get(search_keyword),
        )
}
