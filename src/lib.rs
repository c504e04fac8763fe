//! Account Service Library
//!
//! User account management: self-registration with email verification,
//! password login with automatic lockout, bearer access tokens and a flat
//! role-based access gate in front of the administrative HTTP API.
//!
//! # Features
//!
//! - **Registration**: validated input, unique email and nickname, generated
//!   nicknames when none is supplied
//! - **Lockout**: consecutive failed logins lock an account atomically in the store
//! - **Email Verification**: single-use tokens delivered by SMTP or logged in development
//! - **Access Tokens**: signed JWTs carrying the subject and its role
//! - **Role Gate**: every protected route names the exact roles it accepts
//! - **Flexible Router**: route groups switched on and off via RouterBuilder
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use account_service::{
//!     api::{create_router, AppState},
//!     database::InMemoryAccountRepository,
//!     service::{AccessGate, AccountService, JwtService, LifecyclePolicy, LogNotifier},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let jwt_service = Arc::new(JwtService::new("change-me"));
//!     let account_service = AccountService::new(
//!         Arc::new(InMemoryAccountRepository::new()),
//!         Arc::new(LogNotifier),
//!         LifecyclePolicy::default(),
//!         "http://localhost:8000/",
//!     );
//!
//!     let state = AppState {
//!         account_service: Arc::new(account_service),
//!         gate: AccessGate::new(jwt_service.clone()),
//!         jwt_service,
//!     };
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, create_router(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **API Layer**: HTTP handlers, bearer authentication and role guards
//! - **Service Layer**: account lifecycle, tokens, access decisions, notifications
//! - **Models**: accounts, roles, claims and request/response payloads
//! - **Database**: the repository trait with PostgreSQL and in-memory stores
//! - **Utils**: hashing, token generation, nicknames, validation and errors

/// HTTP API layer with handlers and configurable routing
pub mod api;

/// Configuration loaded from the environment
pub mod config;

/// Account storage: repository trait, PostgreSQL and in-memory implementations
pub mod database;

/// Data models and request/response structures
pub mod models;

/// Account lifecycle, token and notification services
pub mod service;

/// Shared utilities for security, validation, and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{create_router, AppState, RouterBuilder};
pub use models::{
    Account, AccountRecord, RegisterRequest, SubjectContext, TokenResponse,
    UpdateAccountRequest, UserRole,
};
pub use service::{
    AccessGate, AccountService, AccountServiceError, EmailService, JwtService, LifecyclePolicy,
    LogNotifier, Notifier,
};
pub use utils::error::{AppError, AppResult, ErrorResponse};

// Re-export database utilities for configuration
pub use database::{
    AccountRepository, DatabaseConfig, DatabasePool, InMemoryAccountRepository,
    PgAccountRepository,
};

// Re-export configuration system
pub use config::{env, AppConfig, ConfigError, EmailConfig, JwtConfig, SecurityConfig, ServerConfig};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
