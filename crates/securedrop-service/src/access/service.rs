//! Access log recording and listing.

use std::sync::Arc;

use tracing::warn;

use securedrop_core::error::AppError;
use securedrop_core::types::pagination::{PageRequest, PageResponse};
use securedrop_database::repositories::AccessLogRepository;
use securedrop_entity::access_log::{AccessAction, AccessLogEntry, CreateAccessLogEntry};

use crate::context::RequestContext;

/// Writes and reads the access log.
#[derive(Debug, Clone)]
pub struct AccessLogService {
    /// Access log repository.
    repo: Arc<AccessLogRepository>,
}

impl AccessLogService {
    /// Creates a new access log service.
    pub fn new(repo: Arc<AccessLogRepository>) -> Self {
        Self { repo }
    }

    /// Appends an entry. Failures are logged and never surface to the caller.
    pub async fn record(
        &self,
        ctx: &RequestContext,
        token_id: i64,
        action: AccessAction,
        details: Option<String>,
    ) {
        let mut entry = CreateAccessLogEntry::new(token_id, action).ip(ctx.ip_address.clone());
        if let Some(details) = details {
            entry = entry.details(details);
        }

        if let Err(e) = self.repo.create(&entry).await {
            warn!(token_id, action = %action, error = %e, "Failed to write access log entry");
        }
    }

    /// Entries for one token, newest first.
    pub async fn list_for_token(
        &self,
        token_id: i64,
        page: PageRequest,
    ) -> Result<PageResponse<AccessLogEntry>, AppError> {
        self.repo.find_by_token(token_id, page).await
    }
}
