//! Raw artifact upload and serving

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::RequireAuthor;
use super::types::FileUploadResponse;

/// Outcome of evaluating a `Range` header against an object of known size
#[derive(Debug, PartialEq, Eq)]
enum ByteRange {
    /// Serve the whole object
    Full,
    /// Inclusive byte range
    Partial(u64, u64),
    Unsatisfiable,
}

/// Evaluate a single `bytes=` range. Malformed and multi-range headers are
/// ignored and the whole object is served.
fn parse_range(value: &str, len: u64) -> ByteRange {
    let Some(spec) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };

    match (start.trim(), end.trim()) {
        ("", "") => ByteRange::Full,
        // Suffix range: the last N bytes
        ("", suffix) => match suffix.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if len == 0 => ByteRange::Unsatisfiable,
            Ok(n) => ByteRange::Partial(len.saturating_sub(n), len - 1),
            Err(_) => ByteRange::Full,
        },
        (start, end) => {
            let Ok(start) = start.parse::<u64>() else {
                return ByteRange::Full;
            };
            if start >= len {
                return ByteRange::Unsatisfiable;
            }
            if end.is_empty() {
                return ByteRange::Partial(start, len - 1);
            }
            match end.parse::<u64>() {
                Ok(end) if end >= start => ByteRange::Partial(start, end.min(len - 1)),
                _ => ByteRange::Full,
            }
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::Internal(format!("Invalid header value: {}", e)))
}

/// PUT /api/files/{section_id}/{file_name} (Author only)
async fn put_file(
    _author: RequireAuthor,
    State(state): State<AppState>,
    Path((section_id, file_name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<FileUploadResponse>), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let size = body.len();

    state
        .recordings
        .save_artifact(&section_id, &file_name, body, content_type)
        .await?;

    // The object is stored; a URL that cannot be produced is left out
    let file_url = match state.recordings.file_url(&section_id, &file_name).await {
        Ok(url) => url,
        Err(e) => {
            warn!("No file URL for {}/{}: {}", section_id, file_name, e);
            None
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(FileUploadResponse {
            backend_type: state.recordings.storage().backend_type().to_string(),
            section_id,
            file_name,
            size,
            file_url,
        }),
    ))
}

/// GET /api/files/{section_id}/{file_name}
async fn get_file(
    State(state): State<AppState>,
    Path((section_id, file_name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let object = state.recordings.get_artifact(&section_id, &file_name).await?;
    let len = object.data.len() as u64;
    let content_type = object.content_type_for(&file_name);

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_range(v, len))
        .unwrap_or(ByteRange::Full);
    debug!("GET file {}/{} ({} bytes, {:?})", section_id, file_name, len, range);

    let mut response = match range {
        ByteRange::Full => (StatusCode::OK, object.data).into_response(),
        ByteRange::Partial(start, end) => {
            let body = object.data.slice(start as usize..=end as usize);
            let mut response = (StatusCode::PARTIAL_CONTENT, body).into_response();
            response.headers_mut().insert(
                header::CONTENT_RANGE,
                header_value(&format!("bytes {}-{}/{}", start, end, len))?,
            );
            response
        }
        ByteRange::Unsatisfiable => {
            let mut response = StatusCode::RANGE_NOT_SATISFIABLE.into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_RANGE, header_value(&format!("bytes */{}", len))?);
            return Ok(response);
        }
    };

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, header_value(&content_type)?);
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(&format!("inline; filename=\"{}\"", file_name))?,
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));

    Ok(response)
}

/// Create file routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/files/{section_id}/{file_name}", get(get_file).put(put_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("bytes=0-9", 100), ByteRange::Partial(0, 9));
        assert_eq!(parse_range("bytes=90-", 100), ByteRange::Partial(90, 99));
        assert_eq!(parse_range("bytes=90-500", 100), ByteRange::Partial(90, 99));
        assert_eq!(parse_range("bytes=-10", 100), ByteRange::Partial(90, 99));
        assert_eq!(parse_range("bytes=-500", 100), ByteRange::Partial(0, 99));
    }

    #[test]
    fn test_parse_range_unsatisfiable() {
        assert_eq!(parse_range("bytes=100-", 100), ByteRange::Unsatisfiable);
        assert_eq!(parse_range("bytes=-0", 100), ByteRange::Unsatisfiable);
        assert_eq!(parse_range("bytes=0-", 0), ByteRange::Unsatisfiable);
    }

    #[test]
    fn test_parse_range_ignores_malformed() {
        assert_eq!(parse_range("items=0-9", 100), ByteRange::Full);
        assert_eq!(parse_range("bytes=0-9,20-29", 100), ByteRange::Full);
        assert_eq!(parse_range("bytes=9-0", 100), ByteRange::Full);
        assert_eq!(parse_range("bytes=abc", 100), ByteRange::Full);
    }
}
