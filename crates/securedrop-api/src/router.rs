//! Route definitions for the SecureDrop Exchange HTTP API.
//!
//! All routes are organized by audience and mounted under `/api`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the Axum router with all routes and the body limit.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.storage.max_upload_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(admin_token_routes())
        .merge(guest_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Admin login
fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/admin/login", post(handlers::auth::admin_login))
}

/// Token CRUD, revocation and logs
fn admin_token_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/tokens",
            get(handlers::tokens::list_tokens).post(handlers::tokens::create_token),
        )
        .route(
            "/admin/tokens/downloadable-dirs",
            get(handlers::tokens::downloadable_dirs),
        )
        .route(
            "/admin/tokens/{id}",
            get(handlers::tokens::get_token)
                .put(handlers::tokens::update_token)
                .delete(handlers::tokens::delete_token),
        )
        .route(
            "/admin/tokens/{id}/revoke",
            post(handlers::tokens::revoke_token),
        )
        .route("/admin/tokens/{id}/logs", get(handlers::tokens::token_logs))
}

/// Guest session and file exchange
fn guest_routes() -> Router<AppState> {
    Router::new()
        .route("/guest/login", post(handlers::auth::guest_login))
        .route("/guest/files", get(handlers::guest::list_files))
        .route("/guest/upload", post(handlers::guest::upload))
        .route(
            "/guest/download/{filename}",
            get(handlers::guest::download).head(handlers::guest::download_head),
        )
}

/// Health
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
