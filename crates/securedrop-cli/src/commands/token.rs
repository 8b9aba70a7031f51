//! Access token commands.

use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use securedrop_core::config::AppConfig;
use securedrop_core::error::AppError;
use securedrop_core::types::pagination::{MAX_PAGE_SIZE, PageRequest};
use securedrop_database::SqlitePool;
use securedrop_database::repositories::{AccessLogRepository, TokenRepository};
use securedrop_entity::token::Token;
use securedrop_service::{
    AccessLogService, RequestContext, TokenReaper, TokenService, UsageAccountant,
};
use securedrop_storage::LocalStorageProvider;

use crate::output::{self, OutputFormat};

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// List tokens, newest first
    List {
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Page size
        #[arg(long, default_value_t = MAX_PAGE_SIZE)]
        limit: u64,
    },
    /// Revoke a token
    Revoke {
        /// Token ID
        id: i64,
    },
    /// Delete tokens that expired more than N days ago
    PurgeExpired {
        /// Retention in days (defaults to `tokens.reap_expired_after_days`, else 0)
        #[arg(long)]
        older_than_days: Option<u32>,
    },
}

/// Token display row
#[derive(Debug, Serialize, Tabled)]
struct TokenRow {
    /// Token ID
    id: i64,
    /// Live status
    status: String,
    /// Uses consumed out of the limit
    usage: String,
    /// Expiry
    expires: String,
    /// Upload / download flags
    access: String,
    /// Description
    description: String,
}

impl From<&Token> for TokenRow {
    fn from(token: &Token) -> Self {
        let limit = if token.max_usage_count == 0 {
            "∞".to_string()
        } else {
            token.max_usage_count.to_string()
        };
        let access = match (token.policy.allow_upload, token.policy.allow_download) {
            (true, true) => "up+down",
            (true, false) => "up",
            (false, true) => "down",
            (false, false) => "-",
        };
        Self {
            id: token.id,
            status: token.status.to_string(),
            usage: format!("{}/{limit}", token.usage_count),
            expires: token
                .expires_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
            access: access.to_string(),
            description: token.description.clone().unwrap_or_default(),
        }
    }
}

/// Execute token commands
pub async fn execute(
    args: &TokenArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let parts = Parts::new(pool);

    match &args.command {
        TokenCommand::List { page, limit } => {
            let service = parts.token_service(&config).await?;
            let tokens = service.list(PageRequest::new(*page, *limit)).await?;
            let rows: Vec<TokenRow> = tokens.items.iter().map(TokenRow::from).collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table {
                println!("{} of {} token(s)", rows.len(), tokens.total);
            }
        }
        TokenCommand::Revoke { id } => {
            let service = parts.token_service(&config).await?;
            let token = service.revoke(&RequestContext::system(), *id).await?;
            output::print_success(&format!("Token {} is now {}", token.id, token.status));
        }
        TokenCommand::PurgeExpired { older_than_days } => {
            let days = older_than_days
                .or(config.tokens.reap_expired_after_days)
                .unwrap_or(0);
            let reaper = TokenReaper::new(parts.tokens, parts.accountant, parts.access_log, days);
            let removed = reaper.run_once().await?;
            output::print_success(&format!(
                "Purged {removed} token(s) expired before {}",
                (Utc::now() - chrono::Duration::days(i64::from(days))).format("%Y-%m-%d %H:%M")
            ));
        }
    }

    Ok(())
}

/// Shared repositories and services for token commands.
struct Parts {
    tokens: Arc<TokenRepository>,
    accountant: Arc<UsageAccountant>,
    access_log: Arc<AccessLogService>,
}

impl Parts {
    fn new(pool: SqlitePool) -> Self {
        let tokens = Arc::new(TokenRepository::new(pool.clone()));
        Self {
            accountant: Arc::new(UsageAccountant::new(Arc::clone(&tokens))),
            access_log: Arc::new(AccessLogService::new(Arc::new(AccessLogRepository::new(
                pool,
            )))),
            tokens,
        }
    }

    async fn token_service(&self, config: &AppConfig) -> Result<TokenService, AppError> {
        let storage = LocalStorageProvider::new(&config.storage.root_path).await?;
        Ok(TokenService::new(
            Arc::clone(&self.tokens),
            Arc::new(storage),
            Arc::clone(&self.accountant),
            Arc::clone(&self.access_log),
        ))
    }
}
