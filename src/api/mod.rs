//! API Layer
//!
//! HTTP API endpoints and request handling for the account service.

pub mod handlers;
pub mod middleware;
pub mod routes;

// Re-export commonly used types
pub use handlers::{AppState, SuccessResponse};
pub use middleware::{
    auth_middleware, extract_auth_user, require_roles, AuthUser, ADMIN_ROLES, ANY_ROLE,
    STAFF_ROLES,
};
pub use routes::{create_router, RouterBuilder};
