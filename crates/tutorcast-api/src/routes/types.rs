//! Request/Response DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

// ==================== Generic ====================

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn success() -> Self {
        Self {
            message: "success".to_string(),
        }
    }
}

// ==================== Recording Types ====================

#[derive(Serialize)]
pub struct UploadRecordingResponse {
    pub message: String,
    pub files: Vec<String>,
}

#[derive(Serialize)]
pub struct FileUploadResponse {
    pub section_id: String,
    pub file_name: String,
    pub size: usize,
    /// Presigned or local download URL, when the backend can produce one
    pub file_url: Option<String>,
    pub backend_type: String,
}

#[derive(Serialize)]
pub struct SectionFilesResponse {
    pub section_id: String,
    pub files: Vec<String>,
}

#[derive(Serialize)]
pub struct DeleteSectionResponse {
    pub deleted: usize,
}

#[derive(Serialize)]
pub struct CopySectionResponse {
    pub copied: usize,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub result: Vec<Value>,
}

// ==================== Layout Types ====================

/// Identifier sent either as a JSON number or a string
#[derive(Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(i64),
    Text(String),
}

impl Identifier {
    pub fn into_string(self) -> String {
        match self {
            Identifier::Number(n) => n.to_string(),
            Identifier::Text(s) => s,
        }
    }
}

#[derive(Deserialize)]
pub struct SaveLayoutRequest {
    pub userid: Identifier,
    pub tutorialid: Identifier,
    pub role: String,
    pub layout: Value,
}

#[derive(Deserialize)]
pub struct GetLayoutRequest {
    pub userid: Identifier,
    pub tutorialid: Identifier,
    pub role: String,
}

#[derive(Serialize)]
pub struct LayoutResponse {
    pub layout: Option<String>,
}

// ==================== Storage Types ====================

#[derive(Serialize)]
pub struct NamespaceInfo {
    pub backend: String,
    pub local_path: String,
    pub bucket: Option<String>,
    /// Bytes on local disk; absent for remote-only backends
    pub size_bytes: Option<u64>,
    /// Whether the bucket answered; absent when no bucket is in use
    pub accessible: Option<bool>,
}

#[derive(Serialize)]
pub struct StorageInfoResponse {
    pub storage_type: String,
    pub recordings: NamespaceInfo,
    pub layouts: NamespaceInfo,
    pub total_size_mb: Option<f64>,
    pub region: String,
    pub endpoint: Option<String>,
}

#[derive(Serialize)]
pub struct StorageHealthResponse {
    pub status: String,
    pub storage_type: String,
    pub backends: Vec<BackendHealth>,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct BackendHealth {
    pub namespace: String,
    pub backend: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reject JSON bodies whose identifiers are blank
pub fn require_non_empty(name: &str, value: String) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", name)));
    }
    Ok(value)
}
