//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use tutorcast_core::CoreError;
use tutorcast_storage::{ErrorKind, StorageError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Auth error: {0}")]
    Auth(#[from] tutorcast_auth::AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Status and error code for a storage failure, by kind
fn storage_status(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::Transient => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE"),
        ErrorKind::InvalidKey => (StatusCode::BAD_REQUEST, "INVALID_KEY"),
        ErrorKind::Fatal => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".to_string(),
            ),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".to_string()),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
            ApiError::Core(e) => match e {
                CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
                CoreError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
                CoreError::Storage(e) => {
                    let (status, code) = storage_status(e.kind());
                    (status, code, e.to_string())
                }
                CoreError::Json(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    e.to_string(),
                ),
            },
            ApiError::Auth(e) => {
                let status = if e.is_forbidden() {
                    StatusCode::FORBIDDEN
                } else {
                    StatusCode::UNAUTHORIZED
                };
                (status, "AUTH_ERROR", e.to_string())
            }
            ApiError::Storage(e) => {
                let (status, code) = storage_status(e.kind());
                (status, code, e.to_string())
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = axum::Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kinds_map_to_stable_statuses() {
        let cases = [
            (StorageError::NotFound("a".into()), StatusCode::NOT_FOUND),
            (StorageError::Transient("a".into()), StatusCode::SERVICE_UNAVAILABLE),
            (StorageError::InvalidKey("a".into()), StatusCode::BAD_REQUEST),
            (StorageError::Fatal("a".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::Storage(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_core_errors_carry_storage_kind() {
        let err = ApiError::Core(CoreError::Storage(StorageError::Transient("timeout".into())));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::Core(CoreError::BadRequest("too large".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_errors() {
        let err = ApiError::Auth(tutorcast_auth::AuthError::InsufficientPermissions);
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
        let err = ApiError::Auth(tutorcast_auth::AuthError::TokenExpired);
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
