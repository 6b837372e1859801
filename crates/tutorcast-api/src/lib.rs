//! Tutorcast REST API
//!
//! This crate provides the Axum-based HTTP API: artifact upload and serving,
//! section management, learner layouts, transcript search and storage
//! diagnostics.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
