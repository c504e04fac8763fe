//! JWT Access Token Service
//!
//! Issues and validates short-lived signed access tokens. Tokens are
//! stateless: nothing is stored, so a token stays valid until it expires.

use crate::config::{ConfigError, JwtConfig};
use crate::models::{AccessTokenClaims, IssuedToken, SubjectContext, UserRole, ACCESS_TOKEN_TYPE};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

/// Default access token lifetime in minutes
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;

/// Reasons a token can be rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is missing required claims")]
    MissingClaims,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Parse a configured algorithm name; only HMAC variants are accepted
pub fn parse_algorithm(name: &str) -> Option<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}

/// JWT service for access token issuance and validation
#[derive(Clone)]
pub struct JwtService {
    /// Shared signing secret
    secret: String,
    algorithm: Algorithm,
    /// Access token lifetime (default: 30 minutes)
    access_token_expires_in: Duration,
}

impl JwtService {
    /// Create a service with HS256 and the default lifetime
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_algorithm_and_expiry(
            secret,
            Algorithm::HS256,
            Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
        )
    }

    pub fn with_algorithm_and_expiry(
        secret: impl Into<String>,
        algorithm: Algorithm,
        access_expires_in: Duration,
    ) -> Self {
        Self {
            secret: secret.into(),
            algorithm,
            access_token_expires_in: access_expires_in,
        }
    }

    /// Build the service from loaded configuration
    pub fn from_config(config: &JwtConfig) -> Result<Self, ConfigError> {
        let algorithm = parse_algorithm(&config.algorithm).ok_or_else(|| {
            ConfigError::Invalid(format!("Unsupported JWT algorithm: {}", config.algorithm))
        })?;
        Ok(Self::with_algorithm_and_expiry(
            config.secret.clone(),
            algorithm,
            Duration::minutes(config.access_token_expire_minutes),
        ))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Access token lifetime in seconds
    pub fn expires_in_seconds(&self) -> i64 {
        self.access_token_expires_in.num_seconds()
    }

    /// Sign a new access token for the subject
    pub fn issue(&self, subject_id: Uuid, role: UserRole) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject_id, role, Utc::now())
    }

    fn issue_at(
        &self,
        subject_id: Uuid,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.access_token_expires_in;
        let claims = AccessTokenClaims::new(subject_id, role, expires_at, now);

        let header = Header::new(self.algorithm);
        let encoding_key = EncodingKey::from_secret(self.secret.as_ref());
        let token = encode(&header, &claims, &encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in: self.expires_in_seconds(),
        })
    }

    /// Validate a token and extract the subject it was issued for
    pub fn validate(&self, token: &str) -> Result<SubjectContext, TokenError> {
        let claims = self.decode_access_token(token)?;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(TokenError::MissingClaims);
        }
        let account_id = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::MissingClaims)?;
        let role = claims
            .role
            .parse::<UserRole>()
            .map_err(|_| TokenError::MissingClaims)?;
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::MissingClaims)?;

        Ok(SubjectContext {
            account_id,
            role,
            token_id: claims.jti,
            expires_at,
        })
    }

    fn decode_access_token(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let decoding_key = DecodingKey::from_secret(self.secret.as_ref());

        decode::<AccessTokenClaims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => {
                    TokenError::MissingClaims
                }
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_service() -> JwtService {
        JwtService::new("test_access_secret_key")
    }

    #[test]
    fn test_from_config() {
        let mut config = JwtConfig {
            secret: "test_access_secret_key".to_string(),
            algorithm: "hs512".to_string(),
            access_token_expire_minutes: 5,
        };
        let service = JwtService::from_config(&config).unwrap();
        assert_eq!(service.algorithm(), Algorithm::HS512);
        assert_eq!(service.expires_in_seconds(), 300);

        config.algorithm = "RS256".to_string();
        assert!(matches!(
            JwtService::from_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_issue_and_validate_round_trip() {
        let service = create_test_service();
        let account_id = Uuid::new_v4();

        let issued = service.issue(account_id, UserRole::Manager).unwrap();
        assert_eq!(issued.expires_in, 30 * 60);

        let context = service.validate(&issued.token).unwrap();
        assert_eq!(context.account_id, account_id);
        assert_eq!(context.role, UserRole::Manager);
        assert_eq!(context.expires_at.timestamp(), issued.expires_at.timestamp());
        assert!(!context.token_id.is_empty());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = JwtService::with_algorithm_and_expiry(
            "test_access_secret_key",
            Algorithm::HS256,
            Duration::seconds(-10),
        );
        let issued = service.issue(Uuid::new_v4(), UserRole::Admin).unwrap();
        assert_eq!(service.validate(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let service = create_test_service();
        let issued = service.issue(Uuid::new_v4(), UserRole::Authenticated).unwrap();

        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();
        let signature = parts[2].clone();
        let flipped = if signature.starts_with('A') { "B" } else { "A" };
        parts[2] = format!("{}{}", flipped, &signature[1..]);
        let tampered = parts.join(".");

        assert_eq!(
            service.validate(&tampered),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = JwtService::new("one_secret");
        let verifier = JwtService::new("another_secret");
        let issued = issuer.issue(Uuid::new_v4(), UserRole::Admin).unwrap();
        assert_eq!(
            verifier.validate(&issued.token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let service = create_test_service();
        assert_eq!(service.validate("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(service.validate(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_missing_role_claim_is_rejected() {
        let service = create_test_service();
        let claims = json!({
            "sub": Uuid::new_v4().to_string(),
            "exp": (Utc::now() + Duration::minutes(5)).timestamp(),
            "iat": Utc::now().timestamp(),
            "jti": "id",
            "type": "access",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_access_secret_key"),
        )
        .unwrap();

        assert_eq!(service.validate(&token), Err(TokenError::MissingClaims));
    }

    #[test]
    fn test_unknown_role_claim_is_rejected() {
        let service = create_test_service();
        let now = Utc::now();
        let mut claims = AccessTokenClaims::new(
            Uuid::new_v4(),
            UserRole::Admin,
            now + Duration::minutes(5),
            now,
        );
        claims.role = "ROOT".to_string();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_access_secret_key"),
        )
        .unwrap();

        assert_eq!(service.validate(&token), Err(TokenError::MissingClaims));
    }

    #[test]
    fn test_configurable_algorithm() {
        let service = JwtService::with_algorithm_and_expiry(
            "secret",
            parse_algorithm("hs512").unwrap(),
            Duration::minutes(5),
        );
        let issued = service.issue(Uuid::new_v4(), UserRole::Anonymous).unwrap();
        assert!(service.validate(&issued.token).is_ok());

        // A verifier pinned to another algorithm refuses the token
        let hs256 = JwtService::new("secret");
        assert!(hs256.validate(&issued.token).is_err());

        assert!(parse_algorithm("RS256").is_none());
    }
}
