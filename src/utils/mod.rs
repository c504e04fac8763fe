//! Utilities Module
//!
//! Shared utilities for error handling, credentials, nickname generation and
//! validation used throughout the account service.

pub mod error;
pub mod nickname;
pub mod security;
pub mod validation;

// Re-export commonly used utilities
pub use error::{AppError, AppResult, ErrorResponse};
pub use nickname::generate_nickname;
pub use security::*;
pub use validation::*;
