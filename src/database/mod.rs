//! Database Module
//!
//! Connection management plus the account repository and its PostgreSQL and
//! in-memory implementations.

pub mod connection;
pub mod memory;
pub mod postgres;
pub mod repository;

// Re-export commonly used types
pub use connection::{DatabaseConfig, DatabasePool, Pagination};
pub use memory::InMemoryAccountRepository;
pub use postgres::PgAccountRepository;
pub use repository::{
    AccountChanges, AccountRepository, NewAccount, RepositoryError, RepositoryResult, UniqueField,
};
