//! The single place where `usage_count` moves.
//!
//! Charges against the same token are serialized by a per-token async
//! mutex; different tokens never contend. The repository additionally
//! guards the update on the `usage_count` it was read with, so two
//! processes sharing one database cannot over-consume either.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use securedrop_core::error::AppError;
use securedrop_database::repositories::{ConsumeOutcome, TokenRepository};
use securedrop_entity::token::TokenStatus;

/// Serializes usage charges per token.
#[derive(Debug)]
pub struct UsageAccountant {
    /// Token repository.
    token_repo: Arc<TokenRepository>,
    /// One lock per token that has been charged.
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl UsageAccountant {
    /// Creates a new accountant.
    pub fn new(token_repo: Arc<TokenRepository>) -> Self {
        Self {
            token_repo,
            locks: DashMap::new(),
        }
    }

    /// Charge one use against `token_id`.
    ///
    /// Re-reads the token under its lock, rejects anything that is not
    /// live-active with `TokenUnavailable`, then increments the count and
    /// persists the recomputed status in one transaction. When that
    /// exhausts a `delete_on_exhaust` token the record is removed too.
    pub async fn attempt_consume(
        &self,
        token_id: i64,
        uploaded_bytes: u64,
    ) -> Result<ConsumeOutcome, AppError> {
        let lock = self.lock_for(token_id);
        let _guard = lock.lock().await;

        let token = self
            .token_repo
            .find_by_id(token_id)
            .await?
            .ok_or_else(|| AppError::invalid_token("Token no longer exists"))?;

        let now = Utc::now();
        token.ensure_active(now)?;

        let next_status = TokenStatus::evaluate(
            TokenStatus::Active,
            token.expires_at,
            token.usage_count + 1,
            token.max_usage_count,
            now,
        );

        let outcome = self
            .token_repo
            .consume_use(&token, next_status, uploaded_bytes)
            .await?;

        debug!(
            token_id,
            usage_count = outcome.token.usage_count,
            status = %outcome.token.status,
            "Charged token use"
        );

        if outcome.deleted {
            info!(token_id, "Token exhausted and deleted");
            self.forget(token_id);
        }

        Ok(outcome)
    }

    /// Drop the lock entry of a token that no longer exists.
    pub fn forget(&self, token_id: i64) {
        self.locks.remove(&token_id);
    }

    fn lock_for(&self, token_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(token_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
