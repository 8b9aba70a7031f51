//! Token repository implementation.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Sqlite, SqlitePool, Transaction};

use securedrop_core::error::{AppError, ErrorKind};
use securedrop_core::result::AppResult;
use securedrop_core::types::pagination::{PageRequest, PageResponse};
use securedrop_entity::token::{NewToken, Token, TokenStatus};

use crate::connection::map_db_error;

/// Result of a successful usage charge.
#[derive(Debug, Clone)]
pub struct ConsumeOutcome {
    /// The token as persisted after the charge.
    pub token: Token,
    /// Whether the charge exhausted the token and removed the record.
    pub deleted: bool,
}

/// Repository for token CRUD and usage accounting.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
}

impl TokenRepository {
    /// Create a new token repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a token by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Token>> {
        sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find token", e))
    }

    /// Find a token by its secret string.
    pub async fn find_by_token_string(&self, token_string: &str) -> AppResult<Option<Token>> {
        sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE token_string = ?")
            .bind(token_string)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find token by string", e)
            })
    }

    /// List tokens, newest first.
    pub async fn list(&self, page: PageRequest) -> AppResult<PageResponse<Token>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count tokens", e))?;

        let tokens = sqlx::query_as::<_, Token>(
            "SELECT * FROM tokens ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list tokens", e))?;

        Ok(PageResponse::new(tokens, page, total.max(0) as u64))
    }

    /// Tokens with an expiry at or before `cutoff`.
    pub async fn find_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Token>> {
        sqlx::query_as::<_, Token>(
            "SELECT * FROM tokens \
             WHERE expires_at IS NOT NULL AND julianday(expires_at) <= julianday(?) \
             ORDER BY id",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list expiring tokens", e)
        })
    }

    /// Whether a string is held by a live token or was retired.
    pub async fn token_string_taken(&self, token_string: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS (SELECT 1 FROM tokens WHERE token_string = ?1) \
             OR EXISTS (SELECT 1 FROM retired_token_strings WHERE token_string = ?1)",
        )
        .bind(token_string)
        .fetch_one(&self.pool)
        .await
        .map(|taken| taken != 0)
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check token string", e)
        })
    }

    /// Insert a new token.
    pub async fn create(&self, data: &NewToken) -> AppResult<Token> {
        let policy = &data.policy;
        sqlx::query_as::<_, Token>(
            "INSERT INTO tokens (token_string, description, status, created_at, expires_at, \
             max_usage_count, usage_count, delete_on_exhaust, uploaded_bytes, \
             page_title, welcome_message, allow_upload, upload_path, allowed_file_types, \
             max_file_size_mb, filename_conflict_strategy, allow_download, downloadable_path, \
             allow_resumable_download, max_total_upload_mb, download_bandwidth_limit_kbps) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&data.token_string)
        .bind(&data.description)
        .bind(TokenStatus::Active)
        .bind(Utc::now())
        .bind(data.expires_at)
        .bind(data.max_usage_count)
        .bind(data.delete_on_exhaust)
        .bind(&policy.page_title)
        .bind(&policy.welcome_message)
        .bind(policy.allow_upload)
        .bind(&policy.upload_path)
        .bind(Json(&policy.allowed_file_types))
        .bind(policy.max_file_size_mb)
        .bind(policy.filename_conflict_strategy)
        .bind(policy.allow_download)
        .bind(&policy.downloadable_path)
        .bind(policy.allow_resumable_download)
        .bind(policy.max_total_upload_mb)
        .bind(policy.download_bandwidth_limit_kbps)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to create token", e))
    }

    /// Persist the editable fields of an active token.
    ///
    /// Returns `None` when the token is gone or no longer stored as active.
    pub async fn update(&self, token: &Token) -> AppResult<Option<Token>> {
        let policy = &token.policy;
        sqlx::query_as::<_, Token>(
            "UPDATE tokens SET description = ?, expires_at = ?, max_usage_count = ?, \
             delete_on_exhaust = ?, page_title = ?, welcome_message = ?, allow_upload = ?, \
             upload_path = ?, allowed_file_types = ?, max_file_size_mb = ?, \
             filename_conflict_strategy = ?, allow_download = ?, downloadable_path = ?, \
             allow_resumable_download = ?, max_total_upload_mb = ?, \
             download_bandwidth_limit_kbps = ? \
             WHERE id = ? AND status = 'active' RETURNING *",
        )
        .bind(&token.description)
        .bind(token.expires_at)
        .bind(token.max_usage_count)
        .bind(token.delete_on_exhaust)
        .bind(&policy.page_title)
        .bind(&policy.welcome_message)
        .bind(policy.allow_upload)
        .bind(&policy.upload_path)
        .bind(Json(&policy.allowed_file_types))
        .bind(policy.max_file_size_mb)
        .bind(policy.filename_conflict_strategy)
        .bind(policy.allow_download)
        .bind(&policy.downloadable_path)
        .bind(policy.allow_resumable_download)
        .bind(policy.max_total_upload_mb)
        .bind(policy.download_bandwidth_limit_kbps)
        .bind(token.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to update token", e))
    }

    /// Mark an active token as revoked. Returns whether a row changed.
    pub async fn revoke(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE tokens SET status = 'revoked' WHERE id = ? AND status = 'active'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke token", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a token and retire its string. Returns whether it existed.
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.begin().await?;
        let deleted = retire_and_delete(&mut tx, id).await?;
        commit(tx).await?;
        Ok(deleted)
    }

    /// Charge one use against a token the caller has already validated.
    ///
    /// `expected` is the token as read by the caller. The update is guarded
    /// on its `usage_count`, so a concurrent charge from another process
    /// surfaces as a `Conflict` instead of an over-consumption.
    pub async fn consume_use(
        &self,
        expected: &Token,
        new_status: TokenStatus,
        uploaded_bytes: u64,
    ) -> AppResult<ConsumeOutcome> {
        let mut tx = self.begin().await?;

        let token = sqlx::query_as::<_, Token>(
            "UPDATE tokens SET usage_count = usage_count + 1, status = ?, \
             uploaded_bytes = uploaded_bytes + ? \
             WHERE id = ? AND usage_count = ? AND status = 'active' RETURNING *",
        )
        .bind(new_status)
        .bind(uploaded_bytes as i64)
        .bind(expected.id)
        .bind(expected.usage_count)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to charge token use", e))?
        .ok_or_else(|| AppError::conflict("Token usage changed concurrently"))?;

        let deleted = token.status == TokenStatus::Exhausted && token.delete_on_exhaust;
        if deleted {
            retire_and_delete(&mut tx, token.id).await?;
        }

        commit(tx).await?;
        Ok(ConsumeOutcome { token, deleted })
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Sqlite>> {
        self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })
    }
}

async fn retire_and_delete(tx: &mut Transaction<'static, Sqlite>, id: i64) -> AppResult<bool> {
    sqlx::query(
        "INSERT OR IGNORE INTO retired_token_strings (token_string, retired_at) \
         SELECT token_string, ? FROM tokens WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to retire token string", e))?;

    let result = sqlx::query("DELETE FROM tokens WHERE id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete token", e))?;

    Ok(result.rows_affected() > 0)
}

async fn commit(tx: Transaction<'static, Sqlite>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
}
