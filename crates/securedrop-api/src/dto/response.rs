//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use securedrop_core::traits::storage::StorageObjectMeta;
use securedrop_entity::access_log::AccessLogEntry;
use securedrop_entity::token::{Token, TokenPolicy, TokenStatus};
use securedrop_service::{AdminLogin, GuestLogin, UploadOutcome};

/// Admin login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    /// Bearer credential.
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// Credential expiry.
    pub expires_at: DateTime<Utc>,
}

impl From<AdminLogin> for AdminLoginResponse {
    fn from(login: AdminLogin) -> Self {
        Self {
            access_token: login.access_token,
            token_type: "bearer".to_string(),
            expires_at: login.expires_at,
        }
    }
}

/// Guest login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestLoginResponse {
    /// Session credential.
    pub session_token: String,
    /// Session expiry.
    pub expires_at: DateTime<Utc>,
    /// Policy frozen into the session.
    pub policy: TokenPolicy,
}

impl From<GuestLogin> for GuestLoginResponse {
    fn from(login: GuestLogin) -> Self {
        Self {
            session_token: login.session_token,
            expires_at: login.expires_at,
            policy: login.policy,
        }
    }
}

/// A token as shown to administrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Token ID.
    pub id: i64,
    /// Secret string.
    pub token_string: String,
    /// Admin-facing note.
    pub description: Option<String>,
    /// Live status.
    pub status: TokenStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Allowed transfers; `0` is unlimited.
    pub max_usage_count: i64,
    /// Transfers consumed.
    pub usage_count: i64,
    /// Uses left, `null` when unlimited.
    pub remaining_uses: Option<i64>,
    /// Delete once exhausted.
    pub delete_on_exhaust: bool,
    /// Bytes uploaded so far.
    pub uploaded_bytes: i64,
    /// Guest policy.
    #[serde(flatten)]
    pub policy: TokenPolicy,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            remaining_uses: token.remaining_uses(),
            id: token.id,
            token_string: token.token_string,
            description: token.description,
            status: token.status,
            created_at: token.created_at,
            expires_at: token.expires_at,
            max_usage_count: token.max_usage_count,
            usage_count: token.usage_count,
            delete_on_exhaust: token.delete_on_exhaust,
            uploaded_bytes: token.uploaded_bytes,
            policy: token.policy,
        }
    }
}

/// A downloadable file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntryResponse {
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modification.
    pub modified_at: Option<DateTime<Utc>>,
}

impl From<StorageObjectMeta> for FileEntryResponse {
    fn from(meta: StorageObjectMeta) -> Self {
        Self {
            name: meta.name,
            size_bytes: meta.size_bytes,
            modified_at: meta.modified_at,
        }
    }
}

/// Guest file listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    /// Files in the download directory.
    pub files: Vec<FileEntryResponse>,
}

/// Guest upload response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Stored name.
    pub filename: String,
    /// Stored size.
    pub size_bytes: u64,
    /// Whether the name was changed.
    pub renamed: bool,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            filename: outcome.filename,
            size_bytes: outcome.size_bytes,
            renamed: outcome.renamed,
        }
    }
}

/// Directories an admin can pick as `downloadable_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadableDirsResponse {
    /// Directory names under the storage root.
    pub directories: Vec<String>,
}

/// An access log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogResponse {
    /// Entry ID.
    pub id: i64,
    /// Client address.
    pub ip_address: Option<String>,
    /// Action name.
    pub action: String,
    /// Free-form details.
    pub details: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl From<AccessLogEntry> for AccessLogResponse {
    fn from(entry: AccessLogEntry) -> Self {
        Self {
            id: entry.id,
            ip_address: entry.ip_address,
            action: entry.action.as_str().to_string(),
            details: entry.details,
            timestamp: entry.created_at,
        }
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Database reachability.
    pub database: String,
}
