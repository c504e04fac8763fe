//! Authentication Middleware
//!
//! Bearer token authentication and role guards for API routes.

use crate::api::handlers::AppState;
use crate::models::{SubjectContext, UserRole};
use crate::service::access::{authorize, UNAUTHENTICATED_MESSAGE};
use crate::utils::error::AppError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Roles allowed to manage other accounts
pub const STAFF_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Manager];

/// Roles allowed to delete accounts and change roles
pub const ADMIN_ROLES: &[UserRole] = &[UserRole::Admin];

/// Every role; any authenticated subject passes
pub const ANY_ROLE: &[UserRole] = &UserRole::ALL;

/// Extension type for storing the authenticated subject in request extensions
#[derive(Debug, Clone)]
pub struct AuthUser(pub SubjectContext);

/// Pull the token out of an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::Authentication(UNAUTHENTICATED_MESSAGE.into()))?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or_else(|| AppError::Authentication(UNAUTHENTICATED_MESSAGE.into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Authentication(UNAUTHENTICATED_MESSAGE.into()));
    }

    Ok(token.trim())
}

/// Authentication middleware
///
/// Validates the bearer token through the access gate and stores the subject
/// in request extensions. Missing or rejected tokens produce a 401 with a
/// `WWW-Authenticate: Bearer` challenge.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&headers)?;
    let subject = state.gate.authenticate(token)?;

    request.extensions_mut().insert(AuthUser(subject));
    Ok(next.run(request).await)
}

/// Role guard; must run after [`auth_middleware`]
///
/// Apply with `from_fn_with_state(STAFF_ROLES, require_roles)`.
pub async fn require_roles(
    State(allowed): State<&'static [UserRole]>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let subject = extract_auth_user(&request)?;
    authorize(subject, allowed)?;
    Ok(next.run(request).await)
}

/// Authenticated subject stored by [`auth_middleware`]
pub fn extract_auth_user(request: &Request) -> Result<&SubjectContext, AppError> {
    request
        .extensions()
        .get::<AuthUser>()
        .map(|auth_user| &auth_user.0)
        .ok_or_else(|| AppError::Authentication(UNAUTHENTICATED_MESSAGE.into()))
}
