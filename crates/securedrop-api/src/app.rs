//! Application builder: wires repositories, services and middleware into an Axum app.

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use securedrop_auth::{JwtDecoder, JwtEncoder, PasswordHasher, PasswordValidator};
use securedrop_core::config::AppConfig;
use securedrop_core::error::AppError;
use securedrop_core::traits::storage::StorageProvider;
use securedrop_database::DatabasePool;
use securedrop_database::repositories::{AccessLogRepository, AdminRepository, TokenRepository};
use securedrop_service::{
    AccessLogService, AdminAuthService, FileGateway, SessionIssuer, TokenReaper, TokenService,
    UsageAccountant,
};
use securedrop_storage::LocalStorageProvider;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Constructs every repository and service on top of a migrated database.
pub async fn build_state(config: AppConfig, db: DatabasePool) -> Result<AppState, AppError> {
    let pool = db.pool().clone();

    // ── Repositories ─────────────────────────────────────────────
    let admin_repo = Arc::new(AdminRepository::new(pool.clone()));
    let token_repo = Arc::new(TokenRepository::new(pool.clone()));
    let access_log_repo = Arc::new(AccessLogRepository::new(pool));

    // ── Auth primitives ──────────────────────────────────────────
    let hasher = Arc::new(PasswordHasher::new());
    let validator = Arc::new(PasswordValidator::new(&config.auth));
    let encoder = Arc::new(JwtEncoder::new(&config.auth, &config.session));
    let decoder = Arc::new(JwtDecoder::new(&config.auth));

    // ── Storage ──────────────────────────────────────────────────
    let storage = LocalStorageProvider::new(&config.storage.root_path)
        .await?
        .with_chunk_size(config.storage.download_chunk_size_bytes);
    info!(root = %storage.root().display(), "Storage root ready");
    let storage: Arc<dyn StorageProvider> = Arc::new(storage);

    // ── Services ─────────────────────────────────────────────────
    let access_log = Arc::new(AccessLogService::new(access_log_repo));
    let accountant = Arc::new(UsageAccountant::new(Arc::clone(&token_repo)));

    let admin_auth = Arc::new(AdminAuthService::new(
        admin_repo,
        hasher,
        validator,
        Arc::clone(&encoder),
        Arc::clone(&decoder),
    ));
    let token_service = Arc::new(TokenService::new(
        Arc::clone(&token_repo),
        Arc::clone(&storage),
        Arc::clone(&accountant),
        Arc::clone(&access_log),
    ));
    let session_issuer = Arc::new(SessionIssuer::new(
        Arc::clone(&token_repo),
        encoder,
        decoder,
        Arc::clone(&access_log),
    ));
    let file_gateway = Arc::new(FileGateway::new(
        storage,
        Arc::clone(&accountant),
        Arc::clone(&access_log),
    ));
    let token_reaper = config.tokens.reap_expired_after_days.map(|days| {
        Arc::new(TokenReaper::new(
            token_repo,
            accountant,
            access_log,
            days,
        ))
    });

    Ok(AppState {
        config: Arc::new(config),
        db,
        admin_auth,
        token_service,
        session_issuer,
        file_gateway,
        token_reaper,
    })
}
