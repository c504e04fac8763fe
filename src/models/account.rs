//! Account Model
//!
//! Core account data structures and the role enumeration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Coarse-grained permission category carried by every account
///
/// Roles form a flat set. No role implies another: an `Admin` does not
/// satisfy a check that only lists `Manager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Anonymous,
    Authenticated,
    Manager,
    Admin,
}

impl UserRole {
    /// All roles, in declaration order
    pub const ALL: [UserRole; 4] = [
        UserRole::Anonymous,
        UserRole::Authenticated,
        UserRole::Manager,
        UserRole::Admin,
    ];

    /// Wire and database name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Anonymous => "ANONYMOUS",
            UserRole::Authenticated => "AUTHENTICATED",
            UserRole::Manager => "MANAGER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Account representation for external API responses
///
/// Never carries the password hash or the pending verification token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
    pub is_locked: bool,
    pub failed_login_attempts: i32,
    pub is_professional: bool,
    pub professional_status_updated_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether the account carries exactly this role
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }
}

/// Internal account representation including credentials
///
/// Used for storage and for the login and verification paths that need the
/// hash or the token. Convert into [`Account`] before it leaves the service.
#[derive(Clone, sqlx::FromRow)]
pub struct AccountRecord {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
    /// bcrypt digest
    pub hashed_password: String,
    /// Present only while email verification is pending
    pub verification_token: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
    pub is_locked: bool,
    pub failed_login_attempts: i32,
    pub is_professional: bool,
    pub professional_status_updated_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Credentials stay out of logs
impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("role", &self.role)
            .field("email_verified", &self.email_verified)
            .field("is_locked", &self.is_locked)
            .field("failed_login_attempts", &self.failed_login_attempts)
            .field("hashed_password", &"<redacted>")
            .field(
                "verification_token",
                &self.verification_token.as_ref().map(|_| "<redacted>"),
            )
            .finish_non_exhaustive()
    }
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        Account {
            id: record.id,
            email: record.email,
            nickname: record.nickname,
            first_name: record.first_name,
            last_name: record.last_name,
            bio: record.bio,
            profile_picture_url: record.profile_picture_url,
            linkedin_profile_url: record.linkedin_profile_url,
            github_profile_url: record.github_profile_url,
            role: record.role,
            email_verified: record.email_verified,
            is_locked: record.is_locked,
            failed_login_attempts: record.failed_login_attempts,
            is_professional: record.is_professional,
            professional_status_updated_at: record.professional_status_updated_at,
            last_login_at: record.last_login_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
