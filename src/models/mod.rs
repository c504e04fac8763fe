//! Data Models Module
//!
//! Account entities, token claims and request/response types.

pub mod account;
pub mod auth;
pub mod requests;

// Re-export commonly used types
pub use account::*;
pub use auth::*;
pub use requests::*;
