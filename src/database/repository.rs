//! Account Repository
//!
//! Storage abstraction for account records. Every method is a single atomic
//! unit against the store: implementations must not let two concurrent calls
//! on the same account interleave inside one method.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::connection::Pagination;
use crate::models::{AccountRecord, UserRole};

/// Unique column that rejected a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Nickname,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::Email => f.write_str("email"),
            UniqueField::Nickname => f.write_str("nickname"),
        }
    }
}

/// Errors raised by repository implementations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// A unique index rejected the write
    #[error("Unique constraint violated on {0}")]
    Conflict(UniqueField),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Fields of a new account; the store assigns id and timestamps
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub nickname: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub hashed_password: String,
    pub verification_token: Option<String>,
    pub role: UserRole,
}

/// Column changes for an existing account; `None` leaves a column untouched
#[derive(Clone, Default)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
    /// Already hashed; plaintext never reaches the store
    pub hashed_password: Option<String>,
    /// Stamps `professional_status_updated_at` when the value changes
    pub is_professional: Option<bool>,
    /// Unlock and zero the failure counter in the same write
    pub clear_lockout: bool,
}

/// Durable storage for account records
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<AccountRecord>>;

    /// Exact match on the normalized email
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<AccountRecord>>;

    async fn find_by_nickname(&self, nickname: &str) -> RepositoryResult<Option<AccountRecord>>;

    /// Fails with [`RepositoryError::Conflict`] when email or nickname is taken
    async fn insert(&self, account: NewAccount) -> RepositoryResult<AccountRecord>;

    /// Returns `None` when the account does not exist
    async fn update(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> RepositoryResult<Option<AccountRecord>>;

    /// Returns whether a row was removed
    async fn delete(&self, id: Uuid) -> RepositoryResult<bool>;

    /// Accounts ordered by creation time
    async fn list(&self, pagination: Pagination) -> RepositoryResult<Vec<AccountRecord>>;

    async fn count(&self) -> RepositoryResult<i64>;

    /// Zero the failure counter and stamp `last_login_at`
    ///
    /// Returns `None` when the account is missing or locked at write time,
    /// so a lock that lands after the credential check still wins.
    async fn record_successful_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<AccountRecord>>;

    /// Increment the failure counter and lock once it reaches `max_attempts`
    ///
    /// The read-increment-write happens in one atomic step so concurrent
    /// failures are all counted.
    async fn record_failed_login(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> RepositoryResult<Option<AccountRecord>>;

    /// Mark the email verified and clear the token, only if `token` matches
    ///
    /// Returns `None` when the account is missing or the token does not match.
    async fn consume_verification_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> RepositoryResult<Option<AccountRecord>>;

    /// Lock, or unlock and zero the failure counter
    async fn set_locked(&self, id: Uuid, locked: bool) -> RepositoryResult<Option<AccountRecord>>;

    async fn set_role(&self, id: Uuid, role: UserRole) -> RepositoryResult<Option<AccountRecord>>;

    /// Cheap connectivity check
    async fn ping(&self) -> RepositoryResult<()>;
}
