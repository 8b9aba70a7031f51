//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use securedrop_core::config::AppConfig;
use securedrop_database::DatabasePool;
use securedrop_service::{
    AdminAuthService, FileGateway, SessionIssuer, TokenReaper, TokenService,
};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// SQLite connection pool
    pub db: DatabasePool,

    // ── Services ─────────────────────────────────────────────
    /// Admin login and credential checks
    pub admin_auth: Arc<AdminAuthService>,
    /// Token CRUD
    pub token_service: Arc<TokenService>,
    /// Guest session issuance
    pub session_issuer: Arc<SessionIssuer>,
    /// Guest file operations
    pub file_gateway: Arc<FileGateway>,
    /// Expired-token reaper, present when a retention window is configured
    pub token_reaper: Option<Arc<TokenReaper>>,
}
