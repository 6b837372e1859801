//! Authenticated user information

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;
use crate::jwt::{Claims, JwtManager};
use crate::role::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub role: UserRole,
}

impl AuthUser {
    /// Create from JWT claims.
    ///
    /// With several roles the most privileged known one wins; unknown roles
    /// get the least privilege.
    pub fn from_claims(claims: &Claims) -> Self {
        let roles: Vec<UserRole> = claims.roles().filter_map(|r| r.parse().ok()).collect();
        let role = if roles.contains(&UserRole::Author) {
            UserRole::Author
        } else if roles.contains(&UserRole::Learner) {
            UserRole::Learner
        } else {
            UserRole::Guest
        };

        Self {
            id: claims.sub.clone(),
            role,
        }
    }

    /// Stand-in used when authentication is disabled
    pub fn anonymous_author() -> Self {
        Self {
            id: "anonymous".to_string(),
            role: UserRole::Author,
        }
    }
}

/// Extract bearer token from authorization header
pub fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Validate an `Authorization` header value and resolve the user
pub fn authenticate(jwt: &JwtManager, header: Option<&str>) -> Result<AuthUser, AuthError> {
    let header = header.ok_or(AuthError::MissingAuthHeader)?;
    let token = extract_bearer_token(header)?;
    let claims = jwt.validate_token(token)?;
    let user = AuthUser::from_claims(&claims);

    debug!("Authenticated user: {} ({})", user.id, user.role);
    Ok(user)
}

/// Require the author role
pub fn require_author(user: &AuthUser) -> Result<(), AuthError> {
    if !user.role.can_author() {
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert!(extract_bearer_token("Basic abc").is_err());
        assert!(extract_bearer_token("Bearer ").is_err());
    }

    #[test]
    fn test_authenticate() {
        let jwt = JwtManager::new("secret", 1);
        let token = jwt.generate_token("5", UserRole::Learner).unwrap();

        let user = authenticate(&jwt, Some(format!("Bearer {}", token).as_str())).unwrap();
        assert_eq!(user.id, "5");
        assert_eq!(user.role, UserRole::Learner);
        assert!(require_author(&user).unwrap_err().is_forbidden());

        assert!(matches!(authenticate(&jwt, None), Err(AuthError::MissingAuthHeader)));
    }

    fn claims_with_roles(role: &str) -> Claims {
        Claims {
            sub: "9".to_string(),
            role: role.to_string(),
            exp: 0,
            iat: 0,
            jti: None,
        }
    }

    #[test]
    fn test_unknown_role_is_guest() {
        assert_eq!(AuthUser::from_claims(&claims_with_roles("superuser")).role, UserRole::Guest);
        assert_eq!(AuthUser::from_claims(&claims_with_roles("")).role, UserRole::Guest);
    }

    #[test]
    fn test_multiple_roles() {
        let user = AuthUser::from_claims(&claims_with_roles("learner,author"));
        assert_eq!(user.role, UserRole::Author);
        assert!(require_author(&user).is_ok());

        assert_eq!(
            AuthUser::from_claims(&claims_with_roles("guest, learner")).role,
            UserRole::Learner
        );
        assert_eq!(
            AuthUser::from_claims(&claims_with_roles("superuser,learner")).role,
            UserRole::Learner
        );
    }
}
