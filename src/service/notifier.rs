//! Account Notifications
//!
//! Outbound messages sent during the account lifecycle. Delivery failures
//! are reported to the caller but never undo the state change that
//! triggered them.

use async_trait::async_trait;
use log::info;
#[cfg(test)]
use std::sync::Mutex;
use thiserror::Error;

use crate::models::Account;

/// Errors raised while composing or delivering a notification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notifier configuration error: {0}")]
    Configuration(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Kind of lifecycle message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    EmailVerification,
    AccountLocked,
}

/// Result of a notification attempt, surfaced to the caller as a warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    Failed(String),
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }

    /// Failure reason, if the attempt failed
    pub fn warning(&self) -> Option<&str> {
        match self {
            NotificationOutcome::Sent => None,
            NotificationOutcome::Failed(reason) => Some(reason),
        }
    }
}

impl From<Result<(), NotifyError>> for NotificationOutcome {
    fn from(result: Result<(), NotifyError>) -> Self {
        match result {
            Ok(()) => NotificationOutcome::Sent,
            Err(e) => NotificationOutcome::Failed(e.to_string()),
        }
    }
}

/// Delivery channel for lifecycle notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send the link that confirms ownership of the account's email
    async fn send_verification_email(
        &self,
        account: &Account,
        verification_url: &str,
    ) -> Result<(), NotifyError>;

    /// Tell the owner that repeated failed logins locked the account
    async fn send_account_locked(&self, account: &Account) -> Result<(), NotifyError>;
}

/// Notifier that only logs; used when real mail is disabled
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_email(
        &self,
        account: &Account,
        _verification_url: &str,
    ) -> Result<(), NotifyError> {
        info!(
            "Mail delivery disabled; verification email for account {} not sent",
            account.id
        );
        Ok(())
    }

    async fn send_account_locked(&self, account: &Account) -> Result<(), NotifyError> {
        info!(
            "Mail delivery disabled; lockout notice for account {} not sent",
            account.id
        );
        Ok(())
    }
}

/// A notification captured by [`RecordingNotifier`]
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub kind: NotificationKind,
    pub email: String,
    pub verification_url: Option<String>,
}

/// Test double that keeps every message it is asked to send
///
/// When built with [`RecordingNotifier::failing`] it records the attempt and
/// then reports a delivery failure.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    fail: bool,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Snapshot of recorded notifications
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Recorded notifications of one kind
    pub fn sent_of(&self, kind: NotificationKind) -> Vec<SentNotification> {
        self.sent().into_iter().filter(|n| n.kind == kind).collect()
    }

    fn record(
        &self,
        kind: NotificationKind,
        account: &Account,
        verification_url: Option<&str>,
    ) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentNotification {
                kind,
                email: account.email.clone(),
                verification_url: verification_url.map(str::to_string),
            });
        }
        if self.fail {
            return Err(NotifyError::Delivery("SMTP relay unavailable".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_email(
        &self,
        account: &Account,
        verification_url: &str,
    ) -> Result<(), NotifyError> {
        self.record(
            NotificationKind::EmailVerification,
            account,
            Some(verification_url),
        )
    }

    async fn send_account_locked(&self, account: &Account) -> Result<(), NotifyError> {
        self.record(NotificationKind::AccountLocked, account, None)
    }
}
