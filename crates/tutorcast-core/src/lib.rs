//! Tutorcast Core Business Logic
//!
//! This crate provides the domain layer over the storage backends: section
//! artifacts, learner layouts and transcript search.

pub mod artifact;
pub mod config;
pub mod error;
pub mod layout;
pub mod recording;
pub mod transcript;

pub use artifact::{ArtifactName, LayoutRole, layout_key, recording_key, section_prefix};
pub use config::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_MB, UploadLimits};
pub use error::CoreError;
pub use layout::LayoutService;
pub use recording::{RecordingService, RecordingUpload};
