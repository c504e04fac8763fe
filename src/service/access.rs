//! Access Control Gate
//!
//! Turns bearer tokens into subjects and checks them against the roles a
//! route allows.

use log::debug;
use std::sync::Arc;

use crate::models::{SubjectContext, UserRole};
use crate::service::jwt::JwtService;
use crate::utils::error::AppError;

/// Message returned when a subject's role is not allowed
pub const FORBIDDEN_MESSAGE: &str = "Operation not permitted";

/// Message returned for a missing or rejected bearer token
pub const UNAUTHENTICATED_MESSAGE: &str = "Could not validate credentials";

#[derive(Clone)]
pub struct AccessGate {
    jwt_service: Arc<JwtService>,
}

impl AccessGate {
    pub fn new(jwt_service: Arc<JwtService>) -> Self {
        Self { jwt_service }
    }

    /// Validate a bearer token and return its subject
    pub fn authenticate(&self, token: &str) -> Result<SubjectContext, AppError> {
        self.jwt_service.validate(token).map_err(|e| {
            debug!("Bearer token rejected: {}", e);
            AppError::Authentication(UNAUTHENTICATED_MESSAGE.to_string())
        })
    }

    /// Allow the subject only if its role is listed
    ///
    /// Membership is exact: no role implies another.
    pub fn authorize(&self, subject: &SubjectContext, allowed: &[UserRole]) -> Result<(), AppError> {
        authorize(subject, allowed)
    }
}

/// Flat role membership check
pub fn authorize(subject: &SubjectContext, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&subject.role) {
        Ok(())
    } else {
        debug!(
            "Account {} with role {} denied; allowed: {:?}",
            subject.account_id, subject.role, allowed
        );
        Err(AppError::Authorization(FORBIDDEN_MESSAGE.to_string()))
    }
}
