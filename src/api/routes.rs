//! API Route Definitions
//!
//! HTTP routes grouped by who may call them. The RouterBuilder enables or
//! disables each group, so a deployment can expose only the public
//! endpoints, only the administrative ones, or everything.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use super::handlers::*;
use super::middleware::{auth_middleware, require_roles, ANY_ROLE, STAFF_ROLES};

/// Builder for creating API routes with configurable route groups
#[derive(Default)]
pub struct RouterBuilder {
    /// GET /health
    health_check: bool,
    /// POST /token, POST /register, GET /verify-email/{id}/{token}
    public_auth: bool,
    /// /users routes, ADMIN or MANAGER with some ADMIN-only operations
    account_admin: bool,
    /// GET /me, any authenticated subject
    current_account: bool,
}

impl RouterBuilder {
    /// Creates a new router builder with all route groups disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Every route group enabled
    pub fn with_all_routes() -> Self {
        Self {
            health_check: true,
            public_auth: true,
            account_admin: true,
            current_account: true,
        }
    }

    /// Health check, login, registration, verification and `/me`
    pub fn with_public_routes() -> Self {
        Self {
            health_check: true,
            public_auth: true,
            account_admin: false,
            current_account: true,
        }
    }

    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    /// Enables or disables token issuance, self-registration and email verification
    pub fn public_auth(mut self, enabled: bool) -> Self {
        self.public_auth = enabled;
        self
    }

    /// Enables or disables the account administration routes under `/users`
    pub fn account_admin(mut self, enabled: bool) -> Self {
        self.account_admin = enabled;
        self
    }

    pub fn current_account(mut self, enabled: bool) -> Self {
        self.current_account = enabled;
        self
    }

    /// Builds the router; authentication layers need the state up front
    pub fn build(self, state: AppState) -> Router<AppState> {
        let mut router = Router::new();

        if self.health_check {
            router = router.route("/health", get(health_check));
        }

        if self.public_auth {
            router = router
                .route("/token", post(issue_token))
                .route("/register", post(register))
                .route("/verify-email/{id}/{token}", get(verify_email));
        }

        if self.account_admin {
            // Creation, deletion, role changes and edits of ADMIN accounts
            // narrow the check to ADMIN in the handler
            let admin = Router::new()
                .route("/users", post(create_account).get(list_accounts))
                .route("/users/", post(create_account).get(list_accounts))
                .route(
                    "/users/{id}",
                    get(get_account).put(update_account).delete(delete_account),
                )
                .route("/users/{id}/role", put(update_role))
                .route("/users/{id}/unlock", post(unlock_account))
                .route("/users/{id}/lock", post(lock_account))
                .route_layer(from_fn_with_state(STAFF_ROLES, require_roles))
                .route_layer(from_fn_with_state(state.clone(), auth_middleware));
            router = router.merge(admin);
        }

        if self.current_account {
            let me = Router::new()
                .route("/me", get(current_account))
                .route_layer(from_fn_with_state(ANY_ROLE, require_roles))
                .route_layer(from_fn_with_state(state, auth_middleware));
            router = router.merge(me);
        }

        router
    }
}

/// Creates all API routes with state applied
pub fn create_router(state: AppState) -> Router {
    RouterBuilder::with_all_routes()
        .build(state.clone())
        .with_state(state)
}
