//! Access log entity model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    /// A guest exchanged the token for a session.
    GuestLogin,
    /// A guest uploaded a file.
    Upload,
    /// A guest downloaded a file.
    Download,
    /// A request tried to escape the storage root.
    PathViolation,
    /// An admin created the token.
    TokenCreated,
    /// An admin edited the token.
    TokenUpdated,
    /// An admin revoked the token.
    TokenRevoked,
    /// The token was deleted by an admin, on exhaustion, or by the reaper.
    TokenDeleted,
}

impl AccessAction {
    /// Return the action as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GuestLogin => "guest_login",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::PathViolation => "path_violation",
            Self::TokenCreated => "token_created",
            Self::TokenUpdated => "token_updated",
            Self::TokenRevoked => "token_revoked",
            Self::TokenDeleted => "token_deleted",
        }
    }
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted access log row. Rows outlive the token they reference.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessLogEntry {
    /// Row identifier.
    pub id: i64,
    /// Token the entry is about.
    pub token_id: Option<i64>,
    /// Client address as reported by the proxy.
    pub ip_address: Option<String>,
    /// Action taken.
    pub action: AccessAction,
    /// Free-form detail (file name, reason).
    pub details: Option<String>,
    /// When it happened.
    pub created_at: DateTime<Utc>,
}

/// Data required to append an access log entry.
#[derive(Debug, Clone)]
pub struct CreateAccessLogEntry {
    /// Token the entry is about.
    pub token_id: Option<i64>,
    /// Client address.
    pub ip_address: Option<String>,
    /// Action taken.
    pub action: AccessAction,
    /// Free-form detail.
    pub details: Option<String>,
}

impl CreateAccessLogEntry {
    /// Entry for `action` on `token_id`.
    pub fn new(token_id: i64, action: AccessAction) -> Self {
        Self {
            token_id: Some(token_id),
            ip_address: None,
            action,
            details: None,
        }
    }

    /// Attach the client address.
    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    /// Attach a detail string.
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
