//! Admin API.
//!
//! Served on its own listener (`admin.bind_address`) and guarded by a
//! bearer key. Exposes the dispatcher's process-wide state for inspection
//! and lets operators purge cached output.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/calls", get(get_calls))
        .route("/admin/hooks", get(get_hooks))
        .route("/admin/cache", get(get_cache))
        .route("/admin/cache/{key}", delete(delete_cache_entry))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
