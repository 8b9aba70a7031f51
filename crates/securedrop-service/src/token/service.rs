//! Token CRUD for administrators.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use securedrop_auth::generate_token_string;
use securedrop_core::error::AppError;
use securedrop_core::traits::storage::StorageProvider;
use securedrop_core::types::pagination::{PageRequest, PageResponse};
use securedrop_database::repositories::TokenRepository;
use securedrop_entity::access_log::{AccessAction, AccessLogEntry};
use securedrop_entity::token::{FilenameConflictStrategy, NewToken, Token, TokenPolicy};

use crate::access::AccessLogService;
use crate::context::RequestContext;
use crate::usage::UsageAccountant;

/// Give up after this many colliding token strings in a row.
const MAX_GENERATION_ATTEMPTS: usize = 8;

/// Request to mint a token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTokenRequest {
    /// Admin-facing note.
    pub description: Option<String>,
    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Allowed transfers; `0` is unlimited.
    pub max_usage_count: i64,
    /// Remove the record once exhausted.
    pub delete_on_exhaust: bool,
    /// Guest policy.
    pub policy: TokenPolicy,
}

/// Partial token update. `None` leaves a field untouched; for nullable
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTokenRequest {
    /// New note.
    pub description: Option<Option<String>>,
    /// New expiry.
    pub expires_at: Option<Option<DateTime<Utc>>>,
    /// New usage limit.
    pub max_usage_count: Option<i64>,
    /// New delete-on-exhaust flag.
    pub delete_on_exhaust: Option<bool>,
    /// New page title.
    pub page_title: Option<Option<String>>,
    /// New welcome message.
    pub welcome_message: Option<Option<String>>,
    /// New upload flag.
    pub allow_upload: Option<bool>,
    /// New upload directory.
    pub upload_path: Option<Option<String>>,
    /// New extension set.
    pub allowed_file_types: Option<Vec<String>>,
    /// New per-file limit.
    pub max_file_size_mb: Option<Option<i64>>,
    /// New conflict strategy.
    pub filename_conflict_strategy: Option<FilenameConflictStrategy>,
    /// New download flag.
    pub allow_download: Option<bool>,
    /// New download directory.
    pub downloadable_path: Option<Option<String>>,
    /// New resumable flag.
    pub allow_resumable_download: Option<bool>,
    /// New upload quota.
    pub max_total_upload_mb: Option<Option<i64>>,
    /// New throttle.
    pub download_bandwidth_limit_kbps: Option<Option<i64>>,
}

impl UpdateTokenRequest {
    fn apply(self, token: &mut Token) {
        let policy = &mut token.policy;
        if let Some(v) = self.description {
            token.description = v;
        }
        if let Some(v) = self.expires_at {
            token.expires_at = v;
        }
        if let Some(v) = self.max_usage_count {
            token.max_usage_count = v;
        }
        if let Some(v) = self.delete_on_exhaust {
            token.delete_on_exhaust = v;
        }
        if let Some(v) = self.page_title {
            policy.page_title = v;
        }
        if let Some(v) = self.welcome_message {
            policy.welcome_message = v;
        }
        if let Some(v) = self.allow_upload {
            policy.allow_upload = v;
        }
        if let Some(v) = self.upload_path {
            policy.upload_path = v;
        }
        if let Some(v) = self.allowed_file_types {
            policy.allowed_file_types = v;
        }
        if let Some(v) = self.max_file_size_mb {
            policy.max_file_size_mb = v;
        }
        if let Some(v) = self.filename_conflict_strategy {
            policy.filename_conflict_strategy = v;
        }
        if let Some(v) = self.allow_download {
            policy.allow_download = v;
        }
        if let Some(v) = self.downloadable_path {
            policy.downloadable_path = v;
        }
        if let Some(v) = self.allow_resumable_download {
            policy.allow_resumable_download = v;
        }
        if let Some(v) = self.max_total_upload_mb {
            policy.max_total_upload_mb = v;
        }
        if let Some(v) = self.download_bandwidth_limit_kbps {
            policy.download_bandwidth_limit_kbps = v;
        }
    }
}

/// Administrative token management.
#[derive(Debug, Clone)]
pub struct TokenService {
    /// Token repository.
    token_repo: Arc<TokenRepository>,
    /// Guarded file store, for the downloadable directory listing.
    storage: Arc<dyn StorageProvider>,
    /// Usage accountant, told about deletions.
    accountant: Arc<UsageAccountant>,
    /// Access log.
    access_log: Arc<AccessLogService>,
}

impl TokenService {
    /// Creates a new token service.
    pub fn new(
        token_repo: Arc<TokenRepository>,
        storage: Arc<dyn StorageProvider>,
        accountant: Arc<UsageAccountant>,
        access_log: Arc<AccessLogService>,
    ) -> Self {
        Self {
            token_repo,
            storage,
            accountant,
            access_log,
        }
    }

    /// Mints a new token with a fresh, never-used token string.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateTokenRequest,
    ) -> Result<Token, AppError> {
        let mut policy = req.policy;
        policy.normalize();
        policy.validate()?;
        validate_limits(req.max_usage_count, 0, req.delete_on_exhaust)?;

        let token_string = self.fresh_token_string().await?;
        let token = self
            .token_repo
            .create(&NewToken {
                token_string,
                description: req.description,
                expires_at: req.expires_at,
                max_usage_count: req.max_usage_count,
                delete_on_exhaust: req.delete_on_exhaust,
                policy,
            })
            .await?;

        info!(
            token_id = token.id,
            admin = ctx.admin_username.as_deref().unwrap_or("-"),
            max_usage_count = token.max_usage_count,
            "Token created"
        );
        self.access_log
            .record(ctx, token.id, AccessAction::TokenCreated, None)
            .await;

        Ok(token.with_live_status(Utc::now()))
    }

    /// Fetches a token with its live status.
    pub async fn get(&self, id: i64) -> Result<Token, AppError> {
        let token = self
            .token_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Token {id} not found")))?;
        Ok(token.with_live_status(Utc::now()))
    }

    /// Lists tokens, newest first, with live statuses.
    pub async fn list(&self, page: PageRequest) -> Result<PageResponse<Token>, AppError> {
        let now = Utc::now();
        Ok(self
            .token_repo
            .list(page)
            .await?
            .map(|t| t.with_live_status(now)))
    }

    /// Applies a partial update to an active token.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        req: UpdateTokenRequest,
    ) -> Result<Token, AppError> {
        let mut token = self
            .token_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Token {id} not found")))?;

        let now = Utc::now();
        let status = token.live_status(now);
        if !status.is_active() {
            return Err(AppError::conflict(format!(
                "Token {id} is {status} and can no longer be edited"
            )));
        }

        req.apply(&mut token);
        token.policy.normalize();
        token.policy.validate()?;
        validate_limits(token.max_usage_count, token.usage_count, token.delete_on_exhaust)?;

        let updated = self
            .token_repo
            .update(&token)
            .await?
            .ok_or_else(|| AppError::conflict(format!("Token {id} changed state during the edit")))?;

        info!(token_id = id, "Token updated");
        self.access_log
            .record(ctx, id, AccessAction::TokenUpdated, None)
            .await;

        Ok(updated.with_live_status(now))
    }

    /// Revokes a token. A token that is already terminal is left alone.
    pub async fn revoke(&self, ctx: &RequestContext, id: i64) -> Result<Token, AppError> {
        let token = self.get(id).await?;
        if !token.status.is_active() {
            return Ok(token);
        }

        if self.token_repo.revoke(id).await? {
            info!(token_id = id, "Token revoked");
            self.access_log
                .record(ctx, id, AccessAction::TokenRevoked, None)
                .await;
        }
        self.get(id).await
    }

    /// Deletes a token and retires its string.
    pub async fn delete(&self, ctx: &RequestContext, id: i64) -> Result<(), AppError> {
        if !self.token_repo.delete(id).await? {
            return Err(AppError::not_found(format!("Token {id} not found")));
        }
        self.accountant.forget(id);

        info!(token_id = id, "Token deleted");
        self.access_log
            .record(ctx, id, AccessAction::TokenDeleted, Some("admin".to_string()))
            .await;
        Ok(())
    }

    /// Immediate subdirectories of the storage root.
    pub async fn downloadable_dirs(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .storage
            .list_dirs("")
            .await?
            .into_iter()
            .map(|d| d.name)
            .collect())
    }

    /// Access log of a token. Works for deleted tokens too.
    pub async fn logs(
        &self,
        id: i64,
        page: PageRequest,
    ) -> Result<PageResponse<AccessLogEntry>, AppError> {
        self.access_log.list_for_token(id, page).await
    }

    async fn fresh_token_string(&self) -> Result<String, AppError> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = generate_token_string();
            if !self.token_repo.token_string_taken(&candidate).await? {
                return Ok(candidate);
            }
            warn!("Generated token string collided, resampling");
        }
        Err(AppError::internal(
            "Could not generate a unique token string",
        ))
    }
}

fn validate_limits(
    max_usage_count: i64,
    usage_count: i64,
    delete_on_exhaust: bool,
) -> Result<(), AppError> {
    if max_usage_count < 0 {
        return Err(AppError::validation("max_usage_count must not be negative"));
    }
    if max_usage_count > 0 && max_usage_count < usage_count {
        return Err(AppError::validation(format!(
            "max_usage_count cannot be lower than the {usage_count} uses already consumed"
        )));
    }
    // Only a charged use deletes an exhausted token, so an edit must not exhaust one.
    if delete_on_exhaust && max_usage_count > 0 && max_usage_count == usage_count {
        return Err(AppError::validation(format!(
            "max_usage_count must exceed the {usage_count} uses already consumed \
             while delete_on_exhaust is set"
        )));
    }
    Ok(())
}
