//! The file gateway: every guest file operation goes through here.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use securedrop_core::error::{AppError, ErrorKind};
use securedrop_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider, WriteMode};
use securedrop_entity::access_log::AccessAction;
use securedrop_storage::check_file_name;

use crate::access::AccessLogService;
use crate::context::RequestContext;
use crate::guest::GuestSession;
use crate::usage::UsageAccountant;

use super::range::{RangeSelection, select_range};
use super::throttle::throttle;

/// Result of a stored upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Name the file was stored under.
    pub filename: String,
    /// Bytes written.
    pub size_bytes: u64,
    /// Whether the name was changed to avoid a conflict.
    pub renamed: bool,
}

/// A download that passed every check and knows what it will send.
#[derive(Debug, Clone)]
pub struct PreparedDownload {
    /// File metadata.
    pub meta: StorageObjectMeta,
    /// Which bytes will be sent.
    pub selection: RangeSelection,
}

impl PreparedDownload {
    /// Number of body bytes a GET would send.
    pub fn content_length(&self) -> u64 {
        match self.selection {
            RangeSelection::Full => self.meta.size_bytes,
            RangeSelection::Partial(range) => range.len(),
            RangeSelection::Unsatisfiable => 0,
        }
    }

    /// MIME type for the response.
    pub fn content_type(&self) -> &str {
        self.meta
            .mime_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}

/// Enforces token policy around the guarded store.
#[derive(Debug, Clone)]
pub struct FileGateway {
    /// Guarded file store.
    storage: Arc<dyn StorageProvider>,
    /// Usage accountant.
    accountant: Arc<UsageAccountant>,
    /// Access log.
    access_log: Arc<AccessLogService>,
}

impl FileGateway {
    /// Creates a new file gateway.
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        accountant: Arc<UsageAccountant>,
        access_log: Arc<AccessLogService>,
    ) -> Self {
        Self {
            storage,
            accountant,
            access_log,
        }
    }

    /// Lists the downloadable files. Unmetered.
    pub async fn list_files(
        &self,
        ctx: &RequestContext,
        session: &GuestSession,
    ) -> Result<Vec<StorageObjectMeta>, AppError> {
        if !session.policy.allow_download {
            return Err(AppError::policy_violation("This token does not allow downloads"));
        }
        let dir = session.policy.download_dir();
        self.guard(ctx, session, dir, self.storage.list_files(dir).await)
            .await
    }

    /// Stores an upload and charges one use.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        session: &GuestSession,
        filename: &str,
        data: Bytes,
    ) -> Result<UploadOutcome, AppError> {
        let policy = &session.policy;
        if !policy.allow_upload {
            return Err(AppError::policy_violation("This token does not allow uploads"));
        }

        if !policy.allows_file_type(filename) {
            return Err(AppError::policy_violation(format!(
                "File type not allowed. Allowed types: {}",
                policy.allowed_file_types.join(", ")
            )));
        }

        let size = data.len() as u64;
        if let Some(limit) = policy.max_file_size_bytes() {
            if size > limit {
                return Err(AppError::policy_violation(format!(
                    "File exceeds the {} MB limit",
                    policy.max_file_size_mb.unwrap_or_default()
                )));
            }
        }
        if let Some(quota) = policy.max_total_upload_bytes() {
            let used = session.token.uploaded_bytes.max(0) as u64;
            if used.saturating_add(size) > quota {
                return Err(AppError::policy_violation(format!(
                    "Upload quota of {} MB exhausted",
                    policy.max_total_upload_mb.unwrap_or_default()
                )));
            }
        }

        self.guard(ctx, session, filename, check_file_name(filename))
            .await?;

        let mode = WriteMode::from(policy.filename_conflict_strategy);
        let written = self
            .storage
            .write(policy.upload_dir(), filename, data, mode)
            .await;
        let stored = self
            .guard(ctx, session, policy.upload_dir(), written)
            .await?;

        // The file is kept even if accounting refuses; storage fails open.
        if let Err(e) = self
            .accountant
            .attempt_consume(session.token_id, stored.size_bytes)
            .await
        {
            error!(
                token_id = session.token_id,
                filename = %stored.name,
                error = %e,
                "Upload stored but usage accounting failed"
            );
        }

        info!(
            token_id = session.token_id,
            filename = %stored.name,
            size_bytes = stored.size_bytes,
            renamed = stored.renamed,
            "File uploaded"
        );
        self.access_log
            .record(ctx, session.token_id, AccessAction::Upload, Some(stored.name.clone()))
            .await;

        Ok(UploadOutcome {
            filename: stored.name,
            size_bytes: stored.size_bytes,
            renamed: stored.renamed,
        })
    }

    /// Resolves a download and decides which bytes to send. Does not charge.
    pub async fn prepare_download(
        &self,
        ctx: &RequestContext,
        session: &GuestSession,
        filename: &str,
        range_header: Option<&str>,
    ) -> Result<PreparedDownload, AppError> {
        let policy = &session.policy;
        if !policy.allow_download {
            return Err(AppError::policy_violation("This token does not allow downloads"));
        }

        let dir = policy.download_dir();
        let meta = self
            .guard(ctx, session, filename, self.storage.metadata(dir, filename).await)
            .await?;

        let selection = if policy.allow_resumable_download {
            select_range(range_header, meta.size_bytes)
        } else {
            RangeSelection::Full
        };

        Ok(PreparedDownload { meta, selection })
    }

    /// Charges one use and opens the body stream.
    ///
    /// Returns `None` when there are no bytes to send; such requests are
    /// not charged.
    pub async fn open_download(
        &self,
        ctx: &RequestContext,
        session: &GuestSession,
        prepared: &PreparedDownload,
    ) -> Result<Option<ByteStream>, AppError> {
        let (offset, length) = match prepared.selection {
            RangeSelection::Full => (0, prepared.meta.size_bytes),
            RangeSelection::Partial(range) => (range.start, range.len()),
            RangeSelection::Unsatisfiable => {
                return Err(AppError::range_not_satisfiable(
                    "Requested range lies outside the file",
                ));
            }
        };
        if length == 0 {
            return Ok(None);
        }

        self.accountant.attempt_consume(session.token_id, 0).await?;

        let name = &prepared.meta.name;
        let stream = self
            .storage
            .read_range(session.policy.download_dir(), name, offset, length)
            .await?;

        info!(
            token_id = session.token_id,
            filename = %name,
            offset,
            length,
            "File download started"
        );
        self.access_log
            .record(ctx, session.token_id, AccessAction::Download, Some(name.clone()))
            .await;

        Ok(Some(match session.policy.download_bytes_per_second() {
            Some(rate) => throttle(stream, rate),
            None => stream,
        }))
    }

    /// Logs path violations as security events before passing the result on.
    async fn guard<T>(
        &self,
        ctx: &RequestContext,
        session: &GuestSession,
        requested: &str,
        result: Result<T, AppError>,
    ) -> Result<T, AppError> {
        if let Err(e) = &result {
            if e.kind == ErrorKind::PathViolation {
                warn!(
                    target: "securedrop::security",
                    token_id = session.token_id,
                    ip = ctx.ip_address.as_deref().unwrap_or("-"),
                    requested,
                    reason = %e.message,
                    "Path violation"
                );
                self.access_log
                    .record(
                        ctx,
                        session.token_id,
                        AccessAction::PathViolation,
                        Some(requested.to_string()),
                    )
                    .await;
            }
        }
        result
    }
}
