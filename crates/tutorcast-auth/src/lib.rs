//! Tutorcast Authentication and Authorization
//!
//! This crate verifies the bearer tokens issued by the account service and
//! resolves them into users with a role.

pub mod error;
pub mod jwt;
pub mod role;
pub mod user;

pub use error::AuthError;
pub use jwt::{Claims, JwtManager};
pub use role::UserRole;
pub use user::{AuthUser, authenticate, extract_bearer_token, require_author};
