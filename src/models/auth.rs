//! Authentication Models
//!
//! Data structures for access tokens and the authenticated subject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::UserRole;

/// Token type claim value for access tokens
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims structure for access tokens
///
/// Contains standard JWT claims plus the subject's role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject - account ID
    pub sub: String,

    /// Role at the time of issuance
    pub role: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// JWT ID - unique token identifier
    pub jti: String,

    /// Token type (always "access" for access tokens)
    #[serde(rename = "type")]
    pub token_type: String,
}

impl AccessTokenClaims {
    /// Create new access token claims
    pub fn new(
        account_id: Uuid,
        role: UserRole,
        expires_at: DateTime<Utc>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: account_id.to_string(),
            role: role.as_str().to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        }
    }
}

/// A freshly signed access token with its lifetime
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

/// Subject extracted from a validated access token
///
/// Reflects the account as it was when the token was issued. Locking the
/// account or changing its role afterwards does not alter a live token.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectContext {
    /// Account ID extracted from token subject
    pub account_id: Uuid,

    /// Role claim
    pub role: UserRole,

    /// Token ID
    pub token_id: String,

    /// Token expiration time
    pub expires_at: DateTime<Utc>,
}

/// Response body of `POST /token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Always "bearer"
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn bearer(issued: IssuedToken) -> Self {
        Self {
            access_token: issued.token,
            token_type: "bearer".to_string(),
            expires_in: issued.expires_in,
        }
    }
}
