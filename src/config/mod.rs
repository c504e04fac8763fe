//! Configuration Module
//!
//! Environment-driven settings for the server, database, token issuer,
//! lockout policy and outbound mail.

use thiserror::Error;

use crate::database::DatabaseConfig;

/// Environment variable helpers
pub mod env {
    use std::env;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get environment variable as boolean with default
    ///
    /// Accepts `true`/`false` in any case as well as `1`/`0`.
    pub fn get_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .ok()
            .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }

    /// Get environment variable as u32 with default
    pub fn get_u32(key: &str, default: u32) -> u32 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u16 with default
    pub fn get_u16(key: &str, default: u16) -> u16 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u64 with default
    pub fn get_u64(key: &str, default: u64) -> u64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i64 with default
    pub fn get_i64(key: &str, default: i64) -> i64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a required environment variable
    pub fn get_required(key: &str) -> Result<String, super::ConfigError> {
        env::var(key).map_err(|_| super::ConfigError::Missing(key.to_string()))
    }
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    Missing(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    /// Present only when real mail delivery is enabled
    pub email: Option<EmailConfig>,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix of links sent to users, e.g. verification links
    pub base_url: String,
    pub log_level: String,
}

/// Access token configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// HS256, HS384 or HS512
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
}

/// Lockout and hashing policy
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub max_login_attempts: i32,
    pub bcrypt_cost: u32,
}

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = env::get_u16("SERVER_PORT", 8000);
        Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port,
            base_url: env::get_string("SERVER_BASE_URL", &format!("http://localhost:{}/", port)),
            log_level: env::get_string("LOG_LEVEL", "info"),
        }
    }

    /// Address to bind the listener to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env::get_required("JWT_SECRET")?,
            algorithm: env::get_string("JWT_ALGORITHM", "HS256"),
            access_token_expire_minutes: env::get_i64(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                crate::service::jwt::DEFAULT_ACCESS_TOKEN_MINUTES,
            ),
        })
    }
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_login_attempts: env::get_i64(
                "MAX_LOGIN_ATTEMPTS",
                defaults.max_login_attempts as i64,
            ) as i32,
            bcrypt_cost: env::get_u32("BCRYPT_COST", defaults.bcrypt_cost),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: 3,
            bcrypt_cost: crate::utils::security::DEFAULT_BCRYPT_COST,
        }
    }
}

impl EmailConfig {
    /// Load SMTP settings when `SEND_REAL_MAIL` is enabled
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        if !env::get_bool("SEND_REAL_MAIL", false) {
            return Ok(None);
        }

        Ok(Some(Self {
            smtp_server: env::get_required("SMTP_SERVER")?,
            smtp_port: env::get_u16("SMTP_PORT", 587),
            smtp_username: env::get_required("SMTP_USERNAME")?,
            smtp_password: env::get_required("SMTP_PASSWORD")?,
            from_email: env::get_required("SMTP_FROM_EMAIL")?,
            from_name: env::get_string("SMTP_FROM_NAME", "Account Service"),
        }))
    }
}

impl AppConfig {
    /// Load complete application configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_env()
            .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?;

        Ok(Self {
            server: ServerConfig::from_env(),
            database,
            jwt: JwtConfig::from_env()?,
            security: SecurityConfig::from_env(),
            email: EmailConfig::from_env()?,
        })
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid(
                "Server port must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database max_connections must be greater than 0".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "Database min_connections cannot be greater than max_connections".into(),
            ));
        }

        if self.jwt.secret.is_empty() {
            return Err(ConfigError::Invalid("JWT secret cannot be empty".into()));
        }
        if crate::service::jwt::parse_algorithm(&self.jwt.algorithm).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Unsupported JWT algorithm: {}",
                self.jwt.algorithm
            )));
        }
        if self.jwt.access_token_expire_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "Access token lifetime must be positive".into(),
            ));
        }

        if self.security.max_login_attempts <= 0 {
            return Err(ConfigError::Invalid(
                "MAX_LOGIN_ATTEMPTS must be greater than 0".into(),
            ));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid(
                "BCRYPT_COST must be between 4 and 31".into(),
            ));
        }

        Ok(())
    }
}
