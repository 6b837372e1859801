//! Authentication extractors

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tutorcast_auth::{AuthUser, authenticate, require_author};

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor for authenticated user (required)
pub struct RequireAuth(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // Skip auth check if disabled
        if !app_state.auth_enabled {
            return Ok(RequireAuth(AuthUser::anonymous_author()));
        }

        let header = parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
        let user = authenticate(&app_state.jwt, header)?;
        Ok(RequireAuth(user))
    }
}

/// Extractor for a user allowed to record and manage sections
pub struct RequireAuthor(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAuthor
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        require_author(&user)?;
        Ok(RequireAuthor(user))
    }
}
