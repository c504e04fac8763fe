//! Request and Response Models
//!
//! Data structures for API request and response payloads with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::account::{Account, UserRole};
use crate::utils::validation::{
    bio_validator, email_validator, name_validator, nickname_validator,
    optional_nickname_validator, password_strength_validator, url_validator,
};

/// Request payload for registering a new account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address (must be unique and valid format)
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    /// Password (8-128 characters with strength requirements)
    #[validate(custom(function = "password_strength_validator"))]
    pub password: String,

    /// Display nickname; generated when absent or blank
    #[serde(default)]
    #[validate(custom(function = "optional_nickname_validator"))]
    pub nickname: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "name_validator"))]
    pub first_name: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "name_validator"))]
    pub last_name: Option<String>,

    /// Role assigned at creation; ANONYMOUS when absent
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl RegisterRequest {
    /// Minimal registration with an email and password
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            nickname: None,
            first_name: None,
            last_name: None,
            role: None,
        }
    }

    /// Nickname if one was supplied and is not blank
    pub fn supplied_nickname(&self) -> Option<&str> {
        self.nickname
            .as_deref()
            .map(str::trim)
            .filter(|nickname| !nickname.is_empty())
    }
}

/// Partial update of an account; absent fields are left untouched
///
/// Every supplied field is validated; one failure rejects the whole update.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: Option<String>,

    #[validate(custom(function = "nickname_validator"))]
    pub nickname: Option<String>,

    #[validate(custom(function = "name_validator"))]
    pub first_name: Option<String>,

    #[validate(custom(function = "name_validator"))]
    pub last_name: Option<String>,

    #[validate(custom(function = "bio_validator"))]
    pub bio: Option<String>,

    #[validate(custom(function = "url_validator"))]
    pub profile_picture_url: Option<String>,

    #[validate(custom(function = "url_validator"))]
    pub linkedin_profile_url: Option<String>,

    #[validate(custom(function = "url_validator"))]
    pub github_profile_url: Option<String>,

    /// New password; hashed before it is stored
    #[validate(custom(function = "password_strength_validator"))]
    pub password: Option<String>,

    pub is_professional: Option<bool>,
}

impl UpdateAccountRequest {
    /// Whether the request carries no changes at all
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.nickname.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.profile_picture_url.is_none()
            && self.linkedin_profile_url.is_none()
            && self.github_profile_url.is_none()
            && self.password.is_none()
            && self.is_professional.is_none()
    }
}

/// Form body of `POST /token`
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Account email
    pub username: String,
    pub password: String,
}

/// Request payload for changing an account's role
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

/// Query parameters for listing accounts
#[derive(Debug, Default, Deserialize)]
pub struct ListAccountsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Response for account registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account: Account,
    pub verification_email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response for email verification
#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub verified: bool,
}

/// Response for administrative lock/unlock/delete calls
#[derive(Debug, Serialize)]
pub struct AccountActionResponse {
    pub success: bool,
}

/// One page of accounts
#[derive(Debug, Serialize)]
pub struct AccountListResponse {
    pub items: Vec<Account>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// Response for health check
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        assert!(RegisterRequest::new("a@x.com", "Str0ngP@ss").validate().is_ok());
        assert!(RegisterRequest::new("invalidemail", "Str0ngP@ss")
            .validate()
            .is_err());
        assert!(RegisterRequest::new("a@x.com", "short").validate().is_err());
    }

    #[test]
    fn test_register_request_blank_nickname_is_absent() {
        let mut request = RegisterRequest::new("a@x.com", "Str0ngP@ss");
        request.nickname = Some("   ".to_string());
        assert_eq!(request.supplied_nickname(), None);
        assert!(request.validate().is_ok());

        request.nickname = Some("no spaces allowed".to_string());
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("nickname"));

        request.nickname = None;
        request.last_name = Some("O'Brien 3rd".to_string());
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_deserialize_defaults() {
        let request: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"Str0ngP@ss"}"#).unwrap();
        assert!(request.nickname.is_none());
        assert!(request.role.is_none());
    }

    #[test]
    fn test_update_request_collects_every_failure() {
        let request = UpdateAccountRequest {
            email: Some("invalidemail".to_string()),
            github_profile_url: Some("not-a-url".to_string()),
            bio: Some("fine".to_string()),
            ..Default::default()
        };

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("github_profile_url"));
    }

    #[test]
    fn test_update_request_rejects_weak_password() {
        let request = UpdateAccountRequest {
            password: Some("password".to_string()),
            ..Default::default()
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_update_request_valid_and_empty() {
        assert!(UpdateAccountRequest::default().is_empty());
        assert!(UpdateAccountRequest::default().validate().is_ok());
        let request = UpdateAccountRequest {
            email: Some("updated_email@example.com".to_string()),
            password: Some("NewPassword123!".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
        assert!(!request.is_empty());
    }
}
