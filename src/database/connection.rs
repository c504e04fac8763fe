//! Database Connection Management
//!
//! Utilities for managing PostgreSQL connections with SQLx.

use log::LevelFilter;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// Database connection pool type alias for convenience
pub type DatabasePool = PgPool;

/// Database configuration for connection setup
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Log every SQL statement at info level
    pub echo: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/account_service".to_string(),
            max_connections: 20,
            min_connections: 5,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(3600),
            echo: false,
        }
    }
}

impl DatabaseConfig {
    /// Create database configuration from environment variables
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let url = std::env::var("DATABASE_URL")?;
        let defaults = Self::default();

        Ok(Self {
            url,
            max_connections: crate::config::env::get_u32(
                "DB_MAX_CONNECTIONS",
                defaults.max_connections,
            ),
            min_connections: crate::config::env::get_u32(
                "DB_MIN_CONNECTIONS",
                defaults.min_connections,
            ),
            connect_timeout: Duration::from_secs(crate::config::env::get_u64(
                "DB_CONNECT_TIMEOUT",
                30,
            )),
            idle_timeout: Duration::from_secs(crate::config::env::get_u64("DB_IDLE_TIMEOUT", 600)),
            max_lifetime: Duration::from_secs(crate::config::env::get_u64(
                "DB_MAX_LIFETIME",
                3600,
            )),
            echo: crate::config::env::get_bool("DATABASE_ECHO", false),
        })
    }

    /// Create a database connection pool from this configuration
    ///
    /// The pool is the only shared handle to the store. Close it with
    /// [`PgPool::close`] on shutdown.
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        let statement_level = if self.echo {
            LevelFilter::Info
        } else {
            LevelFilter::Off
        };
        let options = PgConnectOptions::from_str(&self.url)?.log_statements(statement_level);

        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .connect_with(options)
            .await
    }
}

/// Offset pagination for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// Largest page a caller may request
    pub const MAX_LIMIT: i64 = 100;

    /// Page size when the caller gives none
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset: skip.max(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_creation() {
        let pagination = Pagination::new(0, 10);
        assert_eq!(pagination.limit, 10);
        assert_eq!(pagination.offset, 0);

        let pagination = Pagination::new(20, 20);
        assert_eq!(pagination.limit, 20);
        assert_eq!(pagination.offset, 20);
    }

    #[test]
    fn test_pagination_clamping() {
        let pagination = Pagination::new(0, 200);
        assert_eq!(pagination.limit, 100);

        let pagination = Pagination::new(-5, 0);
        assert_eq!(pagination.offset, 0);
        assert_eq!(pagination.limit, 1);
    }

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(!config.echo);
    }
}
