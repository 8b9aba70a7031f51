//! SecureDrop Exchange server: access tokens and guarded file exchange.
//!
//! Main entry point that wires all crates together and starts the server.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use securedrop_api::{build_app, build_state};
use securedrop_core::config::AppConfig;
use securedrop_core::error::AppError;
use securedrop_database::DatabasePool;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment.
///
/// `SECUREDROP_CONFIG` points at an explicit file; otherwise
/// `SECUREDROP_ENV` picks the overlay merged over `config/default.toml`.
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("SECUREDROP_CONFIG") {
        Ok(path) => AppConfig::load_from(&path),
        Err(_) => {
            let env =
                std::env::var("SECUREDROP_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SecureDrop Exchange v{}", env!("CARGO_PKG_VERSION"));
    if config.auth.jwt_secret == "CHANGE_ME_IN_PRODUCTION" {
        tracing::warn!("auth.jwt_secret is the built-in default; set SECUREDROP__AUTH__JWT_SECRET");
    }

    // ── Step 1: Create data directories ──────────────────────────
    tokio::fs::create_dir_all(&config.storage.root_path)
        .await
        .map_err(|e| {
            AppError::internal(format!(
                "Failed to create storage root '{}': {e}",
                config.storage.root_path
            ))
        })?;

    // ── Step 2: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;
    securedrop_database::migration::run_migrations(db.pool()).await?;

    // ── Step 3: Repositories, auth and services ──────────────────
    let state = build_state(config, db.clone()).await?;
    let config = state.config.clone();

    // ── Step 4: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Expired-token reaper ─────────────────────────────
    let reaper_handle = match state.token_reaper.clone() {
        Some(reaper) => {
            let interval = Duration::from_secs(config.tokens.reap_interval_minutes.max(1) * 60);
            tracing::info!(
                retention_days = config.tokens.reap_expired_after_days,
                interval_minutes = config.tokens.reap_interval_minutes,
                "Expired-token reaper enabled"
            );
            let cancel = shutdown_rx.clone();
            Some(tokio::spawn(async move { reaper.run(interval, cancel).await }))
        }
        None => {
            tracing::info!("Expired-token reaper disabled");
            None
        }
    };

    // ── Step 6: Build and start HTTP server ──────────────────────
    let app = build_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("SecureDrop Exchange listening on {addr}");

    // ── Step 7: Graceful shutdown ────────────────────────────────
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    })
    .await
    .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 8: Wait for background tasks ────────────────────────
    if let Some(handle) = reaper_handle {
        let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Reaper did not stop within the grace period");
        }
    }
    db.close().await;

    tracing::info!("SecureDrop Exchange shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
