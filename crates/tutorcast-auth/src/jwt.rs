//! JWT token management

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::AuthError;
use crate::role::UserRole;

/// JWT claims
///
/// Tokens issued by the account service carry the user id as an integer
/// `id` and the roles as a comma-separated `rls` string. Both spellings are
/// accepted on decode; tokens minted here use `sub` and `role`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    #[serde(alias = "id", deserialize_with = "subject")]
    pub sub: String,
    /// Comma-separated user roles
    #[serde(default, alias = "rls")]
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Token id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Individual role names, trimmed and lowercased
    pub fn roles(&self) -> impl Iterator<Item = String> + '_ {
        self.role
            .split(',')
            .map(|r| r.trim().to_ascii_lowercase())
            .filter(|r| !r.is_empty())
    }
}

fn subject<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subject {
        Number(i64),
        Text(String),
    }

    Ok(match Subject::deserialize(deserializer)? {
        Subject::Number(n) => n.to_string(),
        Subject::Text(s) => s,
    })
}

/// Issues and verifies HS256 tokens signed with the shared application secret
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl JwtManager {
    pub fn new(secret: &str, token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_hours,
        }
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user_id: &str, role: UserRole) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.token_expiry_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: None,
        };

        debug!("Generating token for user: {}", user_id);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Validate a JWT token and return claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::Jwt(e),
            }
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_and_validation() {
        let manager = JwtManager::new("test-secret-key", 24);

        let token = manager.generate_token("17", UserRole::Author).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "17");
        assert_eq!(claims.role, "author");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new("test-secret-key", 24);

        let result = manager.validate_token("invalid-token");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let token = JwtManager::new("one-secret", 24)
            .generate_token("17", UserRole::Learner)
            .unwrap();
        assert!(JwtManager::new("other-secret", 24).validate_token(&token).is_err());
    }

    #[derive(Serialize)]
    struct AccountServiceClaims {
        iat: i64,
        exp: i64,
        jti: String,
        id: u64,
        rls: String,
    }

    fn account_service_token(secret: &str, id: u64, rls: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = AccountServiceClaims {
            iat: now,
            exp: now + 3600,
            jti: "a1b2c3".to_string(),
            id,
            rls: rls.to_string(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_account_service_token() {
        let manager = JwtManager::new("s", 1);

        let claims = manager
            .validate_token(&account_service_token("s", 5, "author"))
            .unwrap();
        assert_eq!(claims.sub, "5");
        assert_eq!(claims.role, "author");
        assert_eq!(claims.jti.as_deref(), Some("a1b2c3"));

        let claims = manager
            .validate_token(&account_service_token("s", 12, "learner, Author"))
            .unwrap();
        assert_eq!(claims.roles().collect::<Vec<_>>(), vec!["learner", "author"]);
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new("test-secret-key", -2);
        let token = manager.generate_token("17", UserRole::Learner).unwrap();
        assert!(matches!(manager.validate_token(&token), Err(AuthError::TokenExpired)));
    }
}
