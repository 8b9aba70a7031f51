//! Physical removal of long-expired tokens.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::watch;
use tokio::time;
use tracing::{error, info};

use securedrop_core::error::AppError;
use securedrop_database::repositories::TokenRepository;
use securedrop_entity::access_log::AccessAction;

use crate::access::AccessLogService;
use crate::context::RequestContext;
use crate::usage::UsageAccountant;

/// Deletes tokens whose `expires_at` lies further back than the retention window.
#[derive(Debug, Clone)]
pub struct TokenReaper {
    /// Token repository.
    token_repo: Arc<TokenRepository>,
    /// Usage accountant, told about deletions.
    accountant: Arc<UsageAccountant>,
    /// Access log.
    access_log: Arc<AccessLogService>,
    /// Retention after expiry, in days.
    retention_days: u32,
}

impl TokenReaper {
    /// Creates a new reaper.
    pub fn new(
        token_repo: Arc<TokenRepository>,
        accountant: Arc<UsageAccountant>,
        access_log: Arc<AccessLogService>,
        retention_days: u32,
    ) -> Self {
        Self {
            token_repo,
            accountant,
            access_log,
            retention_days,
        }
    }

    /// Runs one pass and returns how many tokens were deleted.
    pub async fn run_once(&self) -> Result<u32, AppError> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(self.retention_days));
        let expired = self.token_repo.find_expired_before(cutoff).await?;

        if expired.is_empty() {
            return Ok(0);
        }

        info!(count = expired.len(), %cutoff, "Found expired tokens to reap");

        let ctx = RequestContext::system();
        let mut reaped = 0u32;
        for token in &expired {
            match self.token_repo.delete(token.id).await {
                Ok(true) => {
                    self.accountant.forget(token.id);
                    self.access_log
                        .record(
                            &ctx,
                            token.id,
                            AccessAction::TokenDeleted,
                            Some("expired".to_string()),
                        )
                        .await;
                    reaped += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(token_id = token.id, error = %e, "Failed to reap expired token");
                }
            }
        }

        info!(reaped, "Token reaping completed");
        Ok(reaped)
    }

    /// Runs passes every `interval` until the cancel signal is received.
    pub async fn run(&self, interval: Duration, mut cancel: watch::Receiver<bool>) {
        info!(
            retention_days = self.retention_days,
            interval_secs = interval.as_secs(),
            "Token reaper started"
        );

        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Token reaper received shutdown signal");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Token reaper pass failed");
                    }
                }
            }
        }
    }
}
