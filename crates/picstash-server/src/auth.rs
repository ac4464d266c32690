//! Credential verification

use crate::error::{ApiError, ErrorCode, MSG_INVALID_TOKEN};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use picstash_core::{Identity, Role};
use serde::{Deserialize, Serialize};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User ID
    pub user_id: String,
    /// Display name
    pub username: String,
    /// Role; unknown values fail decoding
    pub role: Role,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Validate a JWT token and extract claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            ApiError::new(ErrorCode::InvalidCredential, MSG_INVALID_TOKEN)
        })
}

/// Convert claims to the identity handed to pipelines
pub fn claims_to_identity(claims: Claims) -> Identity {
    Identity::new(claims.user_id, claims.username, claims.role)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Sign a token for `identity`, valid for `ttl`.
///
/// Tokens are normally minted by the external identity service; this is
/// for local tooling and tests that need a credential the server accepts.
pub fn issue_token(
    identity: &Identity,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        user_id: identity.user_id.clone(),
        username: identity.username.clone(),
        role: identity.role,
        exp: (now + ttl).timestamp(),
        iat: Some(now.timestamp()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
