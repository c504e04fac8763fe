//! PostgreSQL Account Repository
//!
//! Each method issues one statement, so Postgres runs every write in its own
//! implicit transaction and row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::connection::Pagination;
use super::repository::{
    AccountChanges, AccountRepository, NewAccount, RepositoryError, RepositoryResult, UniqueField,
};
use crate::models::{AccountRecord, UserRole};

const ACCOUNT_COLUMNS: &str = "id, email, nickname, first_name, last_name, bio, \
    profile_picture_url, linkedin_profile_url, github_profile_url, hashed_password, \
    verification_token, role, email_verified, is_locked, failed_login_attempts, \
    is_professional, professional_status_updated_at, last_login_at, created_at, updated_at";

const EMAIL_CONSTRAINT: &str = "accounts_email_key";
const NICKNAME_CONSTRAINT: &str = "accounts_nickname_key";

/// Account repository backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map unique-index violations onto the field that caused them
fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.constraint() {
            Some(EMAIL_CONSTRAINT) => return RepositoryError::Conflict(UniqueField::Email),
            Some(NICKNAME_CONSTRAINT) => return RepositoryError::Conflict(UniqueField::Nickname),
            _ => {}
        }
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<AccountRecord>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<AccountRecord>> {
        let sql = format!("SELECT {} FROM accounts WHERE email = $1", ACCOUNT_COLUMNS);
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_by_nickname(&self, nickname: &str) -> RepositoryResult<Option<AccountRecord>> {
        let sql = format!("SELECT {} FROM accounts WHERE nickname = $1", ACCOUNT_COLUMNS);
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(nickname)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn insert(&self, account: NewAccount) -> RepositoryResult<AccountRecord> {
        let sql = format!(
            r#"
            INSERT INTO accounts
                (id, email, nickname, first_name, last_name, hashed_password,
                 verification_token, role, email_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&account.email)
            .bind(&account.nickname)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.hashed_password)
            .bind(&account.verification_token)
            .bind(account.role)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> RepositoryResult<Option<AccountRecord>> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET
                email = COALESCE($2, email),
                nickname = COALESCE($3, nickname),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                bio = COALESCE($6, bio),
                profile_picture_url = COALESCE($7, profile_picture_url),
                linkedin_profile_url = COALESCE($8, linkedin_profile_url),
                github_profile_url = COALESCE($9, github_profile_url),
                hashed_password = COALESCE($10, hashed_password),
                professional_status_updated_at = CASE
                    WHEN $11::BOOLEAN IS NOT NULL AND $11 IS DISTINCT FROM is_professional
                    THEN NOW()
                    ELSE professional_status_updated_at
                END,
                is_professional = COALESCE($11, is_professional),
                is_locked = CASE WHEN $12 THEN FALSE ELSE is_locked END,
                failed_login_attempts = CASE WHEN $12 THEN 0 ELSE failed_login_attempts END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(id)
            .bind(&changes.email)
            .bind(&changes.nickname)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(&changes.bio)
            .bind(&changes.profile_picture_url)
            .bind(&changes.linkedin_profile_url)
            .bind(&changes.github_profile_url)
            .bind(&changes.hashed_password)
            .bind(changes.is_professional)
            .bind(changes.clear_lockout)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, pagination: Pagination) -> RepositoryResult<Vec<AccountRecord>> {
        let sql = format!(
            "SELECT {} FROM accounts ORDER BY created_at, id LIMIT $1 OFFSET $2",
            ACCOUNT_COLUMNS
        );
        let records = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn record_successful_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<AccountRecord>> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET failed_login_attempts = 0,
                last_login_at = $2,
                updated_at = GREATEST($2, created_at)
            WHERE id = $1 AND is_locked = FALSE
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn record_failed_login(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> RepositoryResult<Option<AccountRecord>> {
        // SET expressions read the pre-update row, hence the + 1 in the lock test
        let sql = format!(
            r#"
            UPDATE accounts
            SET failed_login_attempts = failed_login_attempts + 1,
                is_locked = is_locked OR failed_login_attempts + 1 >= $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(id)
            .bind(max_attempts)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn consume_verification_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> RepositoryResult<Option<AccountRecord>> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET email_verified = TRUE,
                verification_token = NULL,
                updated_at = NOW()
            WHERE id = $1 AND verification_token = $2
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(id)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn set_locked(&self, id: Uuid, locked: bool) -> RepositoryResult<Option<AccountRecord>> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET is_locked = $2,
                failed_login_attempts = CASE WHEN $2 THEN failed_login_attempts ELSE 0 END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(id)
            .bind(locked)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> RepositoryResult<Option<AccountRecord>> {
        let sql = format!(
            "UPDATE accounts SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, AccountRecord>(&sql)
            .bind(id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
