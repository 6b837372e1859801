//! Tutorcast Storage Layer
//!
//! This crate provides the storage abstraction for recorded tutorial
//! artifacts: a local disk backend, an S3-compatible remote backend, a hybrid
//! backend that composes the two with fallback, and a one-shot migration
//! runner.

pub mod backend;
pub mod config;
pub mod error;
pub mod hybrid;
pub mod key;
pub mod local;
pub mod migration;
pub mod remote;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    ComponentHealth, HEALTH_CHECK_PREFIX, StorageBackend, StorageObject, compute_sha256,
    guess_content_type,
};
pub use config::{LocalConfig, StorageConfig, StorageMode, StorageNamespace, StorageSet, build_backend};
pub use error::{ErrorKind, StorageError};
pub use hybrid::HybridStorage;
pub use key::StorageKey;
pub use local::LocalStorage;
pub use migration::{MigrationEntry, MigrationOptions, MigrationOutcome, MigrationReport, MigrationRunner};
pub use remote::{DEFAULT_REMOTE_TIMEOUT, RemoteConfig, RemoteStorage};
