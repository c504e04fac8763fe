//! In-Memory Account Repository
//!
//! Map-backed store used by tests and local runs without PostgreSQL. Each
//! method holds the write guard for its whole read-modify-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Pagination;
use super::repository::{
    AccountChanges, AccountRepository, NewAccount, RepositoryError, RepositoryResult, UniqueField,
};
use crate::models::{AccountRecord, UserRole};

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<Uuid, AccountRecord>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn touch(record: &mut AccountRecord, now: DateTime<Utc>) {
    record.updated_at = now.max(record.created_at);
}

fn taken(
    accounts: &HashMap<Uuid, AccountRecord>,
    except: Option<Uuid>,
    field: UniqueField,
    value: &str,
) -> bool {
    accounts.values().any(|record| {
        Some(record.id) != except
            && match field {
                UniqueField::Email => record.email == value,
                UniqueField::Nickname => record.nickname == value,
            }
    })
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<AccountRecord>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<AccountRecord>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|r| r.email == email).cloned())
    }

    async fn find_by_nickname(&self, nickname: &str) -> RepositoryResult<Option<AccountRecord>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|r| r.nickname == nickname).cloned())
    }

    async fn insert(&self, account: NewAccount) -> RepositoryResult<AccountRecord> {
        let mut accounts = self.accounts.write().await;

        if taken(&accounts, None, UniqueField::Email, &account.email) {
            return Err(RepositoryError::Conflict(UniqueField::Email));
        }
        if taken(&accounts, None, UniqueField::Nickname, &account.nickname) {
            return Err(RepositoryError::Conflict(UniqueField::Nickname));
        }

        let now = Utc::now();
        let record = AccountRecord {
            id: Uuid::new_v4(),
            email: account.email,
            nickname: account.nickname,
            first_name: account.first_name,
            last_name: account.last_name,
            bio: None,
            profile_picture_url: None,
            linkedin_profile_url: None,
            github_profile_url: None,
            hashed_password: account.hashed_password,
            verification_token: account.verification_token,
            role: account.role,
            email_verified: false,
            is_locked: false,
            failed_login_attempts: 0,
            is_professional: false,
            professional_status_updated_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        accounts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> RepositoryResult<Option<AccountRecord>> {
        let mut accounts = self.accounts.write().await;

        if !accounts.contains_key(&id) {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            if taken(&accounts, Some(id), UniqueField::Email, email) {
                return Err(RepositoryError::Conflict(UniqueField::Email));
            }
        }
        if let Some(nickname) = &changes.nickname {
            if taken(&accounts, Some(id), UniqueField::Nickname, nickname) {
                return Err(RepositoryError::Conflict(UniqueField::Nickname));
            }
        }

        let Some(record) = accounts.get_mut(&id) else {
            return Ok(None);
        };
        let now = Utc::now();

        if let Some(email) = changes.email {
            record.email = email;
        }
        if let Some(nickname) = changes.nickname {
            record.nickname = nickname;
        }
        if changes.first_name.is_some() {
            record.first_name = changes.first_name;
        }
        if changes.last_name.is_some() {
            record.last_name = changes.last_name;
        }
        if changes.bio.is_some() {
            record.bio = changes.bio;
        }
        if changes.profile_picture_url.is_some() {
            record.profile_picture_url = changes.profile_picture_url;
        }
        if changes.linkedin_profile_url.is_some() {
            record.linkedin_profile_url = changes.linkedin_profile_url;
        }
        if changes.github_profile_url.is_some() {
            record.github_profile_url = changes.github_profile_url;
        }
        if let Some(hash) = changes.hashed_password {
            record.hashed_password = hash;
        }
        if let Some(professional) = changes.is_professional {
            if professional != record.is_professional {
                record.professional_status_updated_at = Some(now);
            }
            record.is_professional = professional;
        }
        if changes.clear_lockout {
            record.is_locked = false;
            record.failed_login_attempts = 0;
        }
        touch(record, now);

        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }

    async fn list(&self, pagination: Pagination) -> RepositoryResult<Vec<AccountRecord>> {
        let accounts = self.accounts.read().await;
        let mut records: Vec<AccountRecord> = accounts.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(records
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect())
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.accounts.read().await.len() as i64)
    }

    async fn record_successful_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<AccountRecord>> {
        let mut accounts = self.accounts.write().await;
        let Some(record) = accounts.get_mut(&id).filter(|record| !record.is_locked) else {
            return Ok(None);
        };
        record.failed_login_attempts = 0;
        record.last_login_at = Some(at);
        touch(record, at);
        Ok(Some(record.clone()))
    }

    async fn record_failed_login(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> RepositoryResult<Option<AccountRecord>> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(&id).map(|record| {
            record.failed_login_attempts += 1;
            if record.failed_login_attempts >= max_attempts {
                record.is_locked = true;
            }
            touch(record, Utc::now());
            record.clone()
        }))
    }

    async fn consume_verification_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> RepositoryResult<Option<AccountRecord>> {
        let mut accounts = self.accounts.write().await;
        let Some(record) = accounts.get_mut(&id) else {
            return Ok(None);
        };
        if record.verification_token.as_deref() != Some(token) {
            return Ok(None);
        }

        record.email_verified = true;
        record.verification_token = None;
        touch(record, Utc::now());
        Ok(Some(record.clone()))
    }

    async fn set_locked(&self, id: Uuid, locked: bool) -> RepositoryResult<Option<AccountRecord>> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(&id).map(|record| {
            record.is_locked = locked;
            if !locked {
                record.failed_login_attempts = 0;
            }
            touch(record, Utc::now());
            record.clone()
        }))
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> RepositoryResult<Option<AccountRecord>> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(&id).map(|record| {
            record.role = role;
            touch(record, Utc::now());
            record.clone()
        }))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
