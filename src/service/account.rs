//! Account Lifecycle Service
//!
//! Registration, login with lockout, email verification and administrative
//! account management on top of an [`AccountRepository`].

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::config::SecurityConfig;
use crate::database::{
    AccountChanges, AccountRepository, NewAccount, Pagination, RepositoryError, UniqueField,
};
use crate::models::{Account, RegisterRequest, UpdateAccountRequest, UserRole};
use crate::service::notifier::{NotificationOutcome, Notifier};
use crate::utils::{
    error::AppError,
    nickname::generate_nickname,
    security::{
        constant_time_compare, generate_verification_token, hash_password_with_cost,
        verify_password, DEFAULT_BCRYPT_COST,
    },
    validation::{check_password_strength, normalize_email},
};

/// Errors raised by account lifecycle operations
#[derive(Error, Debug)]
pub enum AccountServiceError {
    /// Input validation failed with detailed error message
    #[error("Validation error: {0}")]
    Validation(String),

    /// Email or nickname already belongs to another account
    #[error("{0} already exists")]
    Duplicate(String),

    /// Unknown email, wrong password or locked account; never says which
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    NotFound,

    /// Every generated nickname collided
    #[error("Could not generate a unique nickname after {0} attempts")]
    NicknameExhausted(u32),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AccountServiceError> for AppError {
    fn from(err: AccountServiceError) -> Self {
        match err {
            AccountServiceError::Validation(msg) => AppError::Validation(msg),
            AccountServiceError::Duplicate(msg) => AppError::Duplicate(format!("{} already exists", msg)),
            AccountServiceError::InvalidCredentials => {
                AppError::Authentication("Incorrect username or password".to_string())
            }
            AccountServiceError::NotFound => AppError::NotFound("Account not found".to_string()),
            AccountServiceError::NicknameExhausted(attempts) => AppError::Internal(format!(
                "Nickname generation exhausted after {} attempts",
                attempts
            )),
            AccountServiceError::Repository(RepositoryError::Conflict(field)) => {
                AppError::Duplicate(format!("{} already exists", field))
            }
            AccountServiceError::Repository(RepositoryError::Database(e)) => AppError::Database(e),
            AccountServiceError::Hashing(e) => AppError::Hashing(e),
            AccountServiceError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type for account service operations
pub type AccountServiceResult<T> = Result<T, AccountServiceError>;

/// Tunables of the account lifecycle
#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
    /// Consecutive failed logins that lock an account
    pub max_login_attempts: i32,
    pub bcrypt_cost: u32,
    /// Generated nickname collisions tolerated before registration fails
    pub max_nickname_attempts: u32,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            max_login_attempts: 3,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            max_nickname_attempts: 100,
        }
    }
}

impl From<&SecurityConfig> for LifecyclePolicy {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            max_login_attempts: config.max_login_attempts,
            bcrypt_cost: config.bcrypt_cost,
            ..Self::default()
        }
    }
}

/// Outcome of a successful registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    /// Whether the verification email went out; failure never undoes the account
    pub notification: NotificationOutcome,
}

/// One page of a listing plus the total row count
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// Account lifecycle service
#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
    notifier: Arc<dyn Notifier>,
    policy: LifecyclePolicy,
    /// Prefix of verification links
    base_url: String,
    nickname_generator: fn() -> String,
}

impl AccountService {
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        notifier: Arc<dyn Notifier>,
        policy: LifecyclePolicy,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            notifier,
            policy,
            base_url: base_url.into(),
            nickname_generator: generate_nickname,
        }
    }

    /// Replace the random nickname source
    pub fn with_nickname_generator(mut self, generator: fn() -> String) -> Self {
        self.nickname_generator = generator;
        self
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Link that confirms ownership of an account's email
    pub fn verification_url(&self, account_id: Uuid, token: &str) -> String {
        format!(
            "{}/verify-email/{}/{}",
            self.base_url.trim_end_matches('/'),
            account_id,
            token
        )
    }

    /// Register a new account and send its verification email
    pub async fn register(&self, request: RegisterRequest) -> AccountServiceResult<Registration> {
        request
            .validate()
            .map_err(|e| AccountServiceError::Validation(format!("Invalid account data: {}", e)))?;

        let email = normalize_email(&request.email);
        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(AccountServiceError::Duplicate("Email".to_string()));
        }

        let supplied_nickname = request.supplied_nickname().map(str::to_string);
        if let Some(nickname) = &supplied_nickname {
            if self.repository.find_by_nickname(nickname).await?.is_some() {
                return Err(AccountServiceError::Duplicate("Nickname".to_string()));
            }
        }

        let hashed_password = self.hash(request.password.clone()).await?;
        let verification_token = generate_verification_token();
        let role = request.role.unwrap_or_default();

        let mut record = None;
        for attempt in 1..=self.policy.max_nickname_attempts {
            let nickname = match &supplied_nickname {
                Some(nickname) => nickname.clone(),
                None => {
                    let candidate = (self.nickname_generator)();
                    if self.repository.find_by_nickname(&candidate).await?.is_some() {
                        debug!("Generated nickname collided (attempt {})", attempt);
                        continue;
                    }
                    candidate
                }
            };

            let new_account = NewAccount {
                email: email.clone(),
                nickname,
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
                hashed_password: hashed_password.clone(),
                verification_token: Some(verification_token.clone()),
                role,
            };

            match self.repository.insert(new_account).await {
                Ok(inserted) => {
                    record = Some(inserted);
                    break;
                }
                Err(RepositoryError::Conflict(UniqueField::Nickname))
                    if supplied_nickname.is_none() =>
                {
                    debug!("Generated nickname taken at insert (attempt {})", attempt);
                }
                Err(RepositoryError::Conflict(field)) => {
                    return Err(AccountServiceError::Duplicate(capitalized(field)));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let Some(record) = record else {
            warn!(
                "Registration gave up after {} nickname collisions",
                self.policy.max_nickname_attempts
            );
            return Err(AccountServiceError::NicknameExhausted(
                self.policy.max_nickname_attempts,
            ));
        };

        let account: Account = record.into();
        info!("Registered account {} with role {}", account.id, account.role);

        let url = self.verification_url(account.id, &verification_token);
        let notification: NotificationOutcome = self
            .notifier
            .send_verification_email(&account, &url)
            .await
            .into();
        if let Some(reason) = notification.warning() {
            warn!(
                "Verification email for account {} not delivered: {}",
                account.id, reason
            );
        }

        Ok(Registration {
            account,
            notification,
        })
    }

    /// Check credentials, applying the lockout policy
    pub async fn login(&self, email: &str, password: &str) -> AccountServiceResult<Account> {
        let email = normalize_email(email);
        let Some(record) = self.repository.find_by_email(&email).await? else {
            debug!("Login rejected: unknown email");
            return Err(AccountServiceError::InvalidCredentials);
        };

        if record.is_locked {
            warn!("Login rejected: account {} is locked", record.id);
            return Err(AccountServiceError::InvalidCredentials);
        }

        let digest = record.hashed_password.clone();
        let candidate = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &digest))
            .await
            .map_err(|e| AccountServiceError::Internal(format!("Password check failed: {}", e)))?;

        if matches {
            // The write re-checks the lock, so a lock racing this login wins
            let Some(updated) = self
                .repository
                .record_successful_login(record.id, Utc::now())
                .await?
            else {
                warn!("Login rejected: account {} locked during login", record.id);
                return Err(AccountServiceError::InvalidCredentials);
            };
            info!("Account {} logged in", updated.id);
            return Ok(updated.into());
        }

        let max_attempts = self.policy.max_login_attempts;
        if let Some(updated) = self
            .repository
            .record_failed_login(record.id, max_attempts)
            .await?
        {
            // Exactly one failure moves the counter onto the threshold
            if updated.is_locked && updated.failed_login_attempts == max_attempts {
                warn!(
                    "Account {} locked after {} failed logins",
                    updated.id, updated.failed_login_attempts
                );
                let account: Account = updated.into();
                if let Err(e) = self.notifier.send_account_locked(&account).await {
                    warn!("Lockout notice for account {} not delivered: {}", account.id, e);
                }
            }
        }

        Err(AccountServiceError::InvalidCredentials)
    }

    /// Consume a verification token; true only for the first exact match
    pub async fn verify_email(&self, account_id: Uuid, token: &str) -> AccountServiceResult<bool> {
        let Some(record) = self.repository.find_by_id(account_id).await? else {
            return Ok(false);
        };
        let Some(stored) = record.verification_token else {
            return Ok(false);
        };
        if !constant_time_compare(&stored, token) {
            return Ok(false);
        }

        let verified = self
            .repository
            .consume_verification_token(account_id, &stored)
            .await?
            .is_some();
        if verified {
            info!("Email verified for account {}", account_id);
        }
        Ok(verified)
    }

    /// Clear the lock and the failure counter; false if the account is absent
    pub async fn unlock(&self, account_id: Uuid) -> AccountServiceResult<bool> {
        let unlocked = self.repository.set_locked(account_id, false).await?.is_some();
        if unlocked {
            info!("Account {} unlocked", account_id);
        }
        Ok(unlocked)
    }

    /// Lock an account manually; false if the account is absent
    pub async fn lock(&self, account_id: Uuid) -> AccountServiceResult<bool> {
        let locked = self.repository.set_locked(account_id, true).await?.is_some();
        if locked {
            info!("Account {} locked by administrator", account_id);
        }
        Ok(locked)
    }

    /// Whether the account with this email is locked; false if absent
    pub async fn is_account_locked(&self, email: &str) -> AccountServiceResult<bool> {
        Ok(self
            .repository
            .find_by_email(&normalize_email(email))
            .await?
            .map(|record| record.is_locked)
            .unwrap_or(false))
    }

    pub async fn update_role(
        &self,
        account_id: Uuid,
        role: UserRole,
    ) -> AccountServiceResult<Account> {
        let record = self
            .repository
            .set_role(account_id, role)
            .await?
            .ok_or(AccountServiceError::NotFound)?;
        info!("Account {} role set to {}", account_id, role);
        Ok(record.into())
    }

    /// Apply a partial update; any invalid field rejects the whole request
    pub async fn update(
        &self,
        account_id: Uuid,
        request: UpdateAccountRequest,
    ) -> AccountServiceResult<Account> {
        request
            .validate()
            .map_err(|e| AccountServiceError::Validation(format!("Invalid account data: {}", e)))?;

        if request.is_empty() {
            return self
                .get_by_id(account_id)
                .await?
                .ok_or(AccountServiceError::NotFound);
        }

        let hashed_password = match request.password {
            Some(password) => Some(self.hash(password).await?),
            None => None,
        };

        let changes = AccountChanges {
            email: request.email.as_deref().map(normalize_email),
            nickname: request.nickname,
            first_name: request.first_name,
            last_name: request.last_name,
            bio: request.bio,
            profile_picture_url: request.profile_picture_url,
            linkedin_profile_url: request.linkedin_profile_url,
            github_profile_url: request.github_profile_url,
            hashed_password,
            is_professional: request.is_professional,
            clear_lockout: false,
        };

        let record = self
            .repository
            .update(account_id, changes)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(field) => AccountServiceError::Duplicate(capitalized(field)),
                other => other.into(),
            })?
            .ok_or(AccountServiceError::NotFound)?;

        Ok(record.into())
    }

    /// Set a new password and clear any lockout; false if the account is absent
    pub async fn reset_password(
        &self,
        account_id: Uuid,
        new_password: &str,
    ) -> AccountServiceResult<bool> {
        check_password_strength(new_password)
            .map_err(|msg| AccountServiceError::Validation(msg.to_string()))?;

        let hashed_password = self.hash(new_password.to_string()).await?;
        let changes = AccountChanges {
            hashed_password: Some(hashed_password),
            clear_lockout: true,
            ..Default::default()
        };

        let reset = self.repository.update(account_id, changes).await?.is_some();
        if reset {
            info!("Password reset for account {}", account_id);
        }
        Ok(reset)
    }

    /// Hard delete; false if the account is absent
    pub async fn delete(&self, account_id: Uuid) -> AccountServiceResult<bool> {
        let deleted = self.repository.delete(account_id).await?;
        if deleted {
            info!("Account {} deleted", account_id);
        }
        Ok(deleted)
    }

    pub async fn get_by_id(&self, account_id: Uuid) -> AccountServiceResult<Option<Account>> {
        Ok(self.repository.find_by_id(account_id).await?.map(Into::into))
    }

    pub async fn get_by_email(&self, email: &str) -> AccountServiceResult<Option<Account>> {
        Ok(self
            .repository
            .find_by_email(&normalize_email(email))
            .await?
            .map(Into::into))
    }

    pub async fn get_by_nickname(&self, nickname: &str) -> AccountServiceResult<Option<Account>> {
        Ok(self
            .repository
            .find_by_nickname(nickname)
            .await?
            .map(Into::into))
    }

    /// Accounts in creation order with the total count
    pub async fn list(&self, pagination: Pagination) -> AccountServiceResult<Page<Account>> {
        let items = self
            .repository
            .list(pagination)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let total = self.repository.count().await?;

        Ok(Page {
            items,
            total,
            skip: pagination.offset,
            limit: pagination.limit,
        })
    }

    pub async fn count(&self) -> AccountServiceResult<i64> {
        Ok(self.repository.count().await?)
    }

    /// Check that the store is reachable
    pub async fn health_check(&self) -> AccountServiceResult<()> {
        Ok(self.repository.ping().await?)
    }

    /// bcrypt is CPU-bound, so it runs off the async workers
    async fn hash(&self, password: String) -> AccountServiceResult<String> {
        let cost = self.policy.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || hash_password_with_cost(&password, cost))
            .await
            .map_err(|e| AccountServiceError::Internal(format!("Password hashing task failed: {}", e)))??;
        Ok(hashed)
    }
}

fn capitalized(field: UniqueField) -> String {
    match field {
        UniqueField::Email => "Email".to_string(),
        UniqueField::Nickname => "Nickname".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{InMemoryAccountRepository, RepositoryResult};
    use crate::models::AccountRecord;
    use crate::service::notifier::{NotificationKind, RecordingNotifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EMAIL: &str = "a@x.com";
    const PASSWORD: &str = "Str0ngP@ss";

    fn test_policy() -> LifecyclePolicy {
        LifecyclePolicy {
            max_login_attempts: 3,
            bcrypt_cost: 4,
            max_nickname_attempts: 5,
        }
    }

    fn create_test_service() -> (AccountService, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let service = AccountService::new(
            Arc::new(InMemoryAccountRepository::new()),
            notifier.clone(),
            test_policy(),
            "http://localhost:8000/",
        );
        (service, notifier)
    }

    /// Locks the account right after the login path reads it
    struct LockAfterRead {
        inner: InMemoryAccountRepository,
    }

    #[async_trait::async_trait]
    impl AccountRepository for LockAfterRead {
        async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<AccountRecord>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<AccountRecord>> {
            let found = self.inner.find_by_email(email).await?;
            if let Some(record) = &found {
                self.inner.set_locked(record.id, true).await?;
            }
            Ok(found)
        }

        async fn find_by_nickname(
            &self,
            nickname: &str,
        ) -> RepositoryResult<Option<AccountRecord>> {
            self.inner.find_by_nickname(nickname).await
        }

        async fn insert(&self, account: NewAccount) -> RepositoryResult<AccountRecord> {
            self.inner.insert(account).await
        }

        async fn update(
            &self,
            id: Uuid,
            changes: AccountChanges,
        ) -> RepositoryResult<Option<AccountRecord>> {
            self.inner.update(id, changes).await
        }

        async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
            self.inner.delete(id).await
        }

        async fn list(&self, pagination: Pagination) -> RepositoryResult<Vec<AccountRecord>> {
            self.inner.list(pagination).await
        }

        async fn count(&self) -> RepositoryResult<i64> {
            self.inner.count().await
        }

        async fn record_successful_login(
            &self,
            id: Uuid,
            at: chrono::DateTime<Utc>,
        ) -> RepositoryResult<Option<AccountRecord>> {
            self.inner.record_successful_login(id, at).await
        }

        async fn record_failed_login(
            &self,
            id: Uuid,
            max_attempts: i32,
        ) -> RepositoryResult<Option<AccountRecord>> {
            self.inner.record_failed_login(id, max_attempts).await
        }

        async fn consume_verification_token(
            &self,
            id: Uuid,
            token: &str,
        ) -> RepositoryResult<Option<AccountRecord>> {
            self.inner.consume_verification_token(id, token).await
        }

        async fn set_locked(
            &self,
            id: Uuid,
            locked: bool,
        ) -> RepositoryResult<Option<AccountRecord>> {
            self.inner.set_locked(id, locked).await
        }

        async fn set_role(
            &self,
            id: Uuid,
            role: UserRole,
        ) -> RepositoryResult<Option<AccountRecord>> {
            self.inner.set_role(id, role).await
        }

        async fn ping(&self) -> RepositoryResult<()> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn test_lock_between_read_and_write_denies_login() {
        let repository = Arc::new(LockAfterRead {
            inner: InMemoryAccountRepository::new(),
        });
        let service = AccountService::new(
            repository.clone(),
            Arc::new(RecordingNotifier::new()),
            test_policy(),
            "http://localhost:8000/",
        );
        let account = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap()
            .account;
        repository.inner.record_failed_login(account.id, 3).await.unwrap();

        let err = service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, AccountServiceError::InvalidCredentials));

        let record = repository.inner.find_by_id(account.id).await.unwrap().unwrap();
        assert!(record.is_locked);
        assert_eq!(record.failed_login_attempts, 1);
        assert!(record.last_login_at.is_none());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, notifier) = create_test_service();

        let registration = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap();
        assert!(registration.notification.is_sent());

        let account = registration.account;
        assert_eq!(account.role, UserRole::Anonymous);
        assert!(!account.email_verified);
        assert!(!account.is_locked);
        assert_eq!(account.failed_login_attempts, 0);
        assert_eq!(account.created_at, account.updated_at);

        let sent = notifier.sent_of(NotificationKind::EmailVerification);
        assert_eq!(sent.len(), 1);
        let url = sent[0].verification_url.clone().unwrap();
        assert!(url.starts_with(&format!(
            "http://localhost:8000/verify-email/{}/",
            account.id
        )));

        let logged_in = service.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(logged_in.id, account.id);
        assert!(logged_in.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let (service, _) = create_test_service();
        service
            .register(RegisterRequest::new("  Mixed@Example.COM ", PASSWORD))
            .await
            .unwrap();

        assert!(service.get_by_email("mixed@example.com").await.unwrap().is_some());
        assert!(service.login("MIXED@example.com", PASSWORD).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (service, _) = create_test_service();
        service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap();

        let err = service
            .register(RegisterRequest::new(EMAIL, "An0ther!Pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountServiceError::Duplicate(_)));
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_duplicate_nickname() {
        let (service, _) = create_test_service();
        let mut first = RegisterRequest::new(EMAIL, PASSWORD);
        first.nickname = Some("taken".to_string());
        service.register(first).await.unwrap();

        let mut second = RegisterRequest::new("b@x.com", PASSWORD);
        second.nickname = Some("taken".to_string());
        let err = service.register(second).await.unwrap_err();
        assert!(matches!(err, AccountServiceError::Duplicate(ref field) if field == "Nickname"));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let (service, _) = create_test_service();

        let err = service
            .register(RegisterRequest::new("invalidemail", PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountServiceError::Validation(_)));

        let err = service
            .register(RegisterRequest::new(EMAIL, "password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountServiceError::Validation(_)));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_generated_nickname_retries_on_collision() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn collides_once() -> String {
            if CALLS.fetch_add(1, Ordering::SeqCst) == 0 {
                "popular_name".to_string()
            } else {
                "fresh_name".to_string()
            }
        }

        let (service, _) = create_test_service();
        let mut first = RegisterRequest::new("b@x.com", PASSWORD);
        first.nickname = Some("popular_name".to_string());
        service.register(first).await.unwrap();

        let service = service.with_nickname_generator(collides_once);
        let registration = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap();
        assert_eq!(registration.account.nickname, "fresh_name");
    }

    #[tokio::test]
    async fn test_generated_nickname_exhaustion() {
        fn always_same() -> String {
            "only_name".to_string()
        }

        let (service, _) = create_test_service();
        let service = service.with_nickname_generator(always_same);
        service
            .register(RegisterRequest::new("b@x.com", PASSWORD))
            .await
            .unwrap();

        let err = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountServiceError::NicknameExhausted(5)));
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_account() {
        let service = AccountService::new(
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(RecordingNotifier::failing()),
            test_policy(),
            "http://localhost:8000/",
        );

        let registration = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap();
        assert!(!registration.notification.is_sent());
        assert!(registration.notification.warning().is_some());
        assert!(service.get_by_id(registration.account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lockout_after_max_failures() {
        let (service, notifier) = create_test_service();
        service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap();

        for _ in 0..3 {
            let err = service.login(EMAIL, "Wr0ng!Pass").await.unwrap_err();
            assert!(matches!(err, AccountServiceError::InvalidCredentials));
        }

        assert!(service.is_account_locked(EMAIL).await.unwrap());
        let account = service.get_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(account.failed_login_attempts, 3);

        // Correct password is refused while locked and the counter stays put
        let err = service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, AccountServiceError::InvalidCredentials));
        let account = service.get_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(account.failed_login_attempts, 3);

        assert_eq!(notifier.sent_of(NotificationKind::AccountLocked).len(), 1);
    }

    #[tokio::test]
    async fn test_successful_login_resets_counter() {
        let (service, _) = create_test_service();
        service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap();

        for _ in 0..2 {
            assert!(service.login(EMAIL, "Wr0ng!Pass").await.is_err());
        }
        let account = service.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(account.failed_login_attempts, 0);
        assert!(!account.is_locked);
    }

    #[tokio::test]
    async fn test_unknown_email_is_invalid_credentials() {
        let (service, _) = create_test_service();
        let err = service.login("nobody@x.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AccountServiceError::InvalidCredentials));
        assert!(!service.is_account_locked("nobody@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_email_once() {
        let (service, notifier) = create_test_service();
        let account = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap()
            .account;
        let url = notifier.sent()[0].verification_url.clone().unwrap();
        let token = url.rsplit('/').next().unwrap().to_string();

        assert!(!service.verify_email(account.id, "wrong").await.unwrap());
        assert!(!service
            .verify_email(account.id, &token.to_uppercase())
            .await
            .unwrap());
        let unchanged = service.get_by_id(account.id).await.unwrap().unwrap();
        assert!(!unchanged.email_verified);

        assert!(service.verify_email(account.id, &token).await.unwrap());
        let verified = service.get_by_id(account.id).await.unwrap().unwrap();
        assert!(verified.email_verified);
        assert_eq!(verified.role, UserRole::Anonymous);

        assert!(!service.verify_email(account.id, &token).await.unwrap());
        assert!(!service.verify_email(Uuid::new_v4(), &token).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlock_and_lock() {
        let (service, _) = create_test_service();
        let account = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap()
            .account;
        for _ in 0..3 {
            let _ = service.login(EMAIL, "Wr0ng!Pass").await;
        }

        assert!(service.unlock(account.id).await.unwrap());
        let unlocked = service.get_by_id(account.id).await.unwrap().unwrap();
        assert!(!unlocked.is_locked);
        assert_eq!(unlocked.failed_login_attempts, 0);
        assert!(service.login(EMAIL, PASSWORD).await.is_ok());

        assert!(service.lock(account.id).await.unwrap());
        assert!(service.is_account_locked(EMAIL).await.unwrap());

        assert!(!service.unlock(Uuid::new_v4()).await.unwrap());
        assert!(!service.lock(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_role_any_to_any() {
        let (service, _) = create_test_service();
        let account = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap()
            .account;

        let promoted = service.update_role(account.id, UserRole::Admin).await.unwrap();
        assert_eq!(promoted.role, UserRole::Admin);
        let demoted = service
            .update_role(account.id, UserRole::Anonymous)
            .await
            .unwrap();
        assert_eq!(demoted.role, UserRole::Anonymous);

        let err = service
            .update_role(Uuid::new_v4(), UserRole::Manager)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_update_validates_every_field() {
        let (service, _) = create_test_service();
        let account = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap()
            .account;

        let request = UpdateAccountRequest {
            bio: Some("Experienced developer".to_string()),
            github_profile_url: Some("not-a-url".to_string()),
            ..Default::default()
        };
        let err = service.update(account.id, request).await.unwrap_err();
        assert!(matches!(err, AccountServiceError::Validation(_)));

        // Nothing was written
        let unchanged = service.get_by_id(account.id).await.unwrap().unwrap();
        assert!(unchanged.bio.is_none());
    }

    #[tokio::test]
    async fn test_update_profile_and_password() {
        let (service, _) = create_test_service();
        let account = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap()
            .account;

        let request = UpdateAccountRequest {
            email: Some("Updated@Example.com".to_string()),
            bio: Some("Experienced developer".to_string()),
            is_professional: Some(true),
            password: Some("NewPassword123!".to_string()),
            ..Default::default()
        };
        let updated = service.update(account.id, request).await.unwrap();
        assert_eq!(updated.email, "updated@example.com");
        assert_eq!(updated.bio.as_deref(), Some("Experienced developer"));
        assert!(updated.is_professional);
        assert!(updated.professional_status_updated_at.is_some());
        assert!(updated.updated_at >= updated.created_at);

        assert!(service.login("updated@example.com", "NewPassword123!").await.is_ok());
        assert!(service.login("updated@example.com", PASSWORD).await.is_err());
    }

    #[tokio::test]
    async fn test_update_duplicate_email_and_missing_account() {
        let (service, _) = create_test_service();
        service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap();
        let other = service
            .register(RegisterRequest::new("b@x.com", PASSWORD))
            .await
            .unwrap()
            .account;

        let request = UpdateAccountRequest {
            email: Some(EMAIL.to_string()),
            ..Default::default()
        };
        let err = service.update(other.id, request.clone()).await.unwrap_err();
        assert!(matches!(err, AccountServiceError::Duplicate(_)));

        let err = service.update(Uuid::new_v4(), request).await.unwrap_err();
        assert!(matches!(err, AccountServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_reset_password_clears_lockout() {
        let (service, _) = create_test_service();
        let account = service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap()
            .account;
        for _ in 0..3 {
            let _ = service.login(EMAIL, "Wr0ng!Pass").await;
        }
        assert!(service.is_account_locked(EMAIL).await.unwrap());

        assert!(matches!(
            service.reset_password(account.id, "weak").await,
            Err(AccountServiceError::Validation(_))
        ));
        assert!(service.reset_password(account.id, "Fresh!Pass9").await.unwrap());
        assert!(!service.is_account_locked(EMAIL).await.unwrap());
        assert!(service.login(EMAIL, "Fresh!Pass9").await.is_ok());

        assert!(!service
            .reset_password(Uuid::new_v4(), "Fresh!Pass9")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_list_and_count() {
        let (service, _) = create_test_service();
        let mut ids = Vec::new();
        for i in 0..3 {
            let account = service
                .register(RegisterRequest::new(format!("user{}@x.com", i), PASSWORD))
                .await
                .unwrap()
                .account;
            ids.push(account.id);
        }

        let page = service.list(Pagination::new(0, 2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.limit, 2);

        assert!(service.delete(ids[0]).await.unwrap());
        assert!(!service.delete(ids[0]).await.unwrap());
        assert_eq!(service.count().await.unwrap(), 2);
        assert!(service.get_by_id(ids[0]).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failed_logins_are_all_counted() {
        let notifier = Arc::new(RecordingNotifier::new());
        let service = Arc::new(AccountService::new(
            Arc::new(InMemoryAccountRepository::new()),
            notifier.clone(),
            LifecyclePolicy {
                max_login_attempts: 100,
                ..test_policy()
            },
            "http://localhost:8000/",
        ));
        service
            .register(RegisterRequest::new(EMAIL, PASSWORD))
            .await
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.login(EMAIL, "Wr0ng!Pass").await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }

        let account = service.get_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(account.failed_login_attempts, 10);
        assert!(!account.is_locked);
    }

    #[test]
    fn test_error_mapping() {
        use axum::http::StatusCode;

        let cases = [
            (AccountServiceError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AccountServiceError::Duplicate("Email".into()), StatusCode::BAD_REQUEST),
            (AccountServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AccountServiceError::NotFound, StatusCode::NOT_FOUND),
            (
                AccountServiceError::NicknameExhausted(100),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AccountServiceError::Repository(RepositoryError::Conflict(UniqueField::Nickname)),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }
}
