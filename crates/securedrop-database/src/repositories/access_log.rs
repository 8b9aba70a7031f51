//! Access log repository implementation.

use chrono::Utc;
use sqlx::SqlitePool;

use securedrop_core::error::{AppError, ErrorKind};
use securedrop_core::result::AppResult;
use securedrop_core::types::pagination::{PageRequest, PageResponse};
use securedrop_entity::access_log::{AccessLogEntry, CreateAccessLogEntry};

/// Repository for the append-only access log.
#[derive(Debug, Clone)]
pub struct AccessLogRepository {
    pool: SqlitePool,
}

impl AccessLogRepository {
    /// Create a new access log repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    pub async fn create(&self, entry: &CreateAccessLogEntry) -> AppResult<AccessLogEntry> {
        sqlx::query_as::<_, AccessLogEntry>(
            "INSERT INTO access_logs (token_id, ip_address, action, details, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(entry.token_id)
        .bind(&entry.ip_address)
        .bind(entry.action)
        .bind(&entry.details)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to write access log", e))
    }

    /// Entries for one token, newest first.
    pub async fn find_by_token(
        &self,
        token_id: i64,
        page: PageRequest,
    ) -> AppResult<PageResponse<AccessLogEntry>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM access_logs WHERE token_id = ?")
            .bind(token_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count access logs", e)
            })?;

        let entries = sqlx::query_as::<_, AccessLogEntry>(
            "SELECT * FROM access_logs WHERE token_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(token_id)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list access logs", e))?;

        Ok(PageResponse::new(entries, page, total.max(0) as u64))
    }
}
