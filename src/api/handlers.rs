//! HTTP Request Handlers
//!
//! Axum handlers for processing HTTP requests and responses.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Form, Json,
};
use chrono::Utc;
use uuid::Uuid;

use super::middleware::{AuthUser, ADMIN_ROLES};
use crate::{
    database::Pagination,
    models::*,
    service::{AccessGate, AccountService, JwtService, Registration},
    utils::error::{AppError, AppResult},
    VERSION,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService>,
    pub jwt_service: Arc<JwtService>,
    pub gate: AccessGate,
}

/// Standard success response wrapper
#[derive(serde::Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

type Created<T> = (StatusCode, Json<SuccessResponse<T>>);

fn registration_response(registration: Registration) -> RegisterResponse {
    RegisterResponse {
        verification_email_sent: registration.notification.is_sent(),
        warning: registration.notification.warning().map(str::to_string),
        account: registration.account,
    }
}

/// Exchange email and password for a bearer token
///
/// Form body `username=<email>&password=<password>`.
pub async fn issue_token(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let account = state
        .account_service
        .login(&form.username, &form.password)
        .await?;

    let issued = state
        .jwt_service
        .issue(account.id, account.role)
        .map_err(|e| AppError::Internal(format!("Token issuance failed: {}", e)))?;

    Ok(Json(TokenResponse::bearer(issued)))
}

/// Public self-registration; the role is always ANONYMOUS
pub async fn register(
    State(state): State<AppState>,
    Json(mut request): Json<RegisterRequest>,
) -> AppResult<Created<RegisterResponse>> {
    request.role = None;

    let registration = state.account_service.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(registration_response(registration))),
    ))
}

/// Consume the token from a verification link
pub async fn verify_email(
    State(state): State<AppState>,
    Path((account_id, token)): Path<(Uuid, String)>,
) -> AppResult<Json<SuccessResponse<VerifyEmailResponse>>> {
    if !state.account_service.verify_email(account_id, &token).await? {
        return Err(AppError::Validation(
            "Invalid or already used verification token".to_string(),
        ));
    }

    Ok(Json(SuccessResponse::new(VerifyEmailResponse {
        verified: true,
    })))
}

/// Create an account on behalf of someone else, with any role; ADMIN only
pub async fn create_account(
    State(state): State<AppState>,
    Extension(AuthUser(subject)): Extension<AuthUser>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Created<RegisterResponse>> {
    state.gate.authorize(&subject, ADMIN_ROLES)?;

    let registration = state.account_service.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(registration_response(registration))),
    ))
}

/// List accounts with `skip`/`limit` pagination
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> AppResult<Json<SuccessResponse<AccountListResponse>>> {
    let pagination = Pagination::new(
        query.skip.unwrap_or(0),
        query.limit.unwrap_or(Pagination::DEFAULT_LIMIT),
    );
    let page = state.account_service.list(pagination).await?;

    Ok(Json(SuccessResponse::new(AccountListResponse {
        items: page.items,
        total: page.total,
        skip: page.skip,
        limit: page.limit,
    })))
}

/// Get account by ID
pub async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> AppResult<Json<SuccessResponse<Account>>> {
    let account = state
        .account_service
        .get_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
    Ok(Json(SuccessResponse::new(account)))
}

/// Only an ADMIN may act on an ADMIN account
async fn guard_admin_target(
    state: &AppState,
    subject: &SubjectContext,
    account_id: Uuid,
) -> AppResult<()> {
    let target = state.account_service.get_by_id(account_id).await?;
    if target.is_some_and(|account| account.role == UserRole::Admin) {
        state.gate.authorize(subject, ADMIN_ROLES)?;
    }
    Ok(())
}

/// Partially update an account
pub async fn update_account(
    State(state): State<AppState>,
    Extension(AuthUser(subject)): Extension<AuthUser>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<UpdateAccountRequest>,
) -> AppResult<Json<SuccessResponse<Account>>> {
    guard_admin_target(&state, &subject, account_id).await?;

    let account = state.account_service.update(account_id, request).await?;
    Ok(Json(SuccessResponse::new(account)))
}

/// Delete an account; ADMIN only
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(AuthUser(subject)): Extension<AuthUser>,
    Path(account_id): Path<Uuid>,
) -> AppResult<Json<SuccessResponse<AccountActionResponse>>> {
    state.gate.authorize(&subject, ADMIN_ROLES)?;

    if !state.account_service.delete(account_id).await? {
        return Err(AppError::NotFound("Account not found".to_string()));
    }
    Ok(Json(SuccessResponse::new(AccountActionResponse {
        success: true,
    })))
}

/// Change an account's role; ADMIN only
pub async fn update_role(
    State(state): State<AppState>,
    Extension(AuthUser(subject)): Extension<AuthUser>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> AppResult<Json<SuccessResponse<Account>>> {
    state.gate.authorize(&subject, ADMIN_ROLES)?;

    let account = state
        .account_service
        .update_role(account_id, request.role)
        .await?;
    Ok(Json(SuccessResponse::new(account)))
}

pub async fn unlock_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> AppResult<Json<SuccessResponse<AccountActionResponse>>> {
    if !state.account_service.unlock(account_id).await? {
        return Err(AppError::NotFound("Account not found".to_string()));
    }
    Ok(Json(SuccessResponse::new(AccountActionResponse {
        success: true,
    })))
}

pub async fn lock_account(
    State(state): State<AppState>,
    Extension(AuthUser(subject)): Extension<AuthUser>,
    Path(account_id): Path<Uuid>,
) -> AppResult<Json<SuccessResponse<AccountActionResponse>>> {
    guard_admin_target(&state, &subject, account_id).await?;

    if !state.account_service.lock(account_id).await? {
        return Err(AppError::NotFound("Account not found".to_string()));
    }
    Ok(Json(SuccessResponse::new(AccountActionResponse {
        success: true,
    })))
}

/// The caller's own account
pub async fn current_account(
    State(state): State<AppState>,
    Extension(AuthUser(subject)): Extension<AuthUser>,
) -> AppResult<Json<SuccessResponse<Account>>> {
    let account = state
        .account_service
        .get_by_id(subject.account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
    Ok(Json(SuccessResponse::new(account)))
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<AppState>,
) -> AppResult<Json<SuccessResponse<HealthCheckResponse>>> {
    // Check store connectivity
    state.account_service.health_check().await?;

    let response = HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: VERSION.to_string(),
    };

    Ok(Json(SuccessResponse::new(response)))
}
