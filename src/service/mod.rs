//! Service Layer
//!
//! Business logic for the account lifecycle, token issuance, access control
//! and outbound notifications.

pub mod access;
pub mod account;
pub mod email_service;
pub mod jwt;
pub mod notifier;

// Re-export services
pub use access::AccessGate;
pub use account::{
    AccountService, AccountServiceError, AccountServiceResult, LifecyclePolicy, Page,
    Registration,
};
pub use email_service::EmailService;
pub use jwt::{JwtService, TokenError};
pub use notifier::{LogNotifier, NotificationKind, NotificationOutcome, Notifier, NotifyError};
#[cfg(test)]
pub use notifier::{RecordingNotifier, SentNotification};
