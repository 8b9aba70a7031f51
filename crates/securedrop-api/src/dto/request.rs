//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use securedrop_entity::token::policy::MAX_POLICY_LIMIT;
use securedrop_entity::token::{FilenameConflictStrategy, TokenPolicy};
use securedrop_service::{CreateTokenRequest, UpdateTokenRequest};

/// Admin login form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdminLoginForm {
    /// Username.
    #[validate(length(min = 1, message = "is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Guest login body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GuestLoginRequest {
    /// The token string handed out by the administrator.
    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub token_string: String,
}

fn default_max_usage() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

/// Body of `POST /admin/tokens`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TokenCreateBody {
    /// Admin-facing note.
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub description: Option<String>,
    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Allowed transfers; `0` is unlimited.
    #[serde(default = "default_max_usage")]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub max_usage_count: i64,
    /// Remove the record once exhausted.
    #[serde(default)]
    pub delete_on_exhaust: bool,

    /// Heading shown on the guest page.
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub page_title: Option<String>,
    /// Message shown on the guest page.
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub welcome_message: Option<String>,
    /// Whether uploads are allowed.
    #[serde(default)]
    pub allow_upload: bool,
    /// Upload directory relative to the storage root.
    pub upload_path: Option<String>,
    /// Accepted extensions.
    #[serde(default)]
    pub allowed_file_types: Vec<String>,
    /// Per-file size limit in MiB.
    #[validate(range(min = 1, max = MAX_POLICY_LIMIT, message = "must be between 1 and 1073741824"))]
    pub max_file_size_mb: Option<i64>,
    /// Behaviour when the upload name is taken.
    #[serde(default)]
    pub filename_conflict_strategy: FilenameConflictStrategy,
    /// Whether downloads are allowed.
    #[serde(default)]
    pub allow_download: bool,
    /// Download directory relative to the storage root.
    pub downloadable_path: Option<String>,
    /// Whether byte-range requests are honoured.
    #[serde(default = "default_true")]
    pub allow_resumable_download: bool,
    /// Cumulative upload quota in MiB.
    #[validate(range(min = 1, max = MAX_POLICY_LIMIT, message = "must be between 1 and 1073741824"))]
    pub max_total_upload_mb: Option<i64>,
    /// Download throttle in KiB/s.
    #[validate(range(min = 1, max = MAX_POLICY_LIMIT, message = "must be between 1 and 1073741824"))]
    pub download_bandwidth_limit_kbps: Option<i64>,
}

impl From<TokenCreateBody> for CreateTokenRequest {
    fn from(body: TokenCreateBody) -> Self {
        CreateTokenRequest {
            description: body.description,
            expires_at: body.expires_at,
            max_usage_count: body.max_usage_count,
            delete_on_exhaust: body.delete_on_exhaust,
            policy: TokenPolicy {
                page_title: body.page_title,
                welcome_message: body.welcome_message,
                allow_upload: body.allow_upload,
                upload_path: body.upload_path,
                allowed_file_types: body.allowed_file_types,
                max_file_size_mb: body.max_file_size_mb,
                filename_conflict_strategy: body.filename_conflict_strategy,
                allow_download: body.allow_download,
                downloadable_path: body.downloadable_path,
                allow_resumable_download: body.allow_resumable_download,
                max_total_upload_mb: body.max_total_upload_mb,
                download_bandwidth_limit_kbps: body.download_bandwidth_limit_kbps,
            },
        }
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `PUT /admin/tokens/{id}`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TokenUpdateBody {
    /// Present only to be refused; the string is immutable.
    #[serde(default)]
    pub token_string: Option<serde_json::Value>,
    /// New note.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// New expiry.
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    /// New usage limit.
    #[validate(range(min = 0, message = "must not be negative"))]
    pub max_usage_count: Option<i64>,
    /// New delete-on-exhaust flag.
    pub delete_on_exhaust: Option<bool>,
    /// New page title.
    #[serde(default, deserialize_with = "double_option")]
    pub page_title: Option<Option<String>>,
    /// New welcome message.
    #[serde(default, deserialize_with = "double_option")]
    pub welcome_message: Option<Option<String>>,
    /// New upload flag.
    pub allow_upload: Option<bool>,
    /// New upload directory.
    #[serde(default, deserialize_with = "double_option")]
    pub upload_path: Option<Option<String>>,
    /// New extension list.
    pub allowed_file_types: Option<Vec<String>>,
    /// New per-file limit.
    #[serde(default, deserialize_with = "double_option")]
    pub max_file_size_mb: Option<Option<i64>>,
    /// New conflict strategy.
    pub filename_conflict_strategy: Option<FilenameConflictStrategy>,
    /// New download flag.
    pub allow_download: Option<bool>,
    /// New download directory.
    #[serde(default, deserialize_with = "double_option")]
    pub downloadable_path: Option<Option<String>>,
    /// New resumable flag.
    pub allow_resumable_download: Option<bool>,
    /// New upload quota.
    #[serde(default, deserialize_with = "double_option")]
    pub max_total_upload_mb: Option<Option<i64>>,
    /// New throttle.
    #[serde(default, deserialize_with = "double_option")]
    pub download_bandwidth_limit_kbps: Option<Option<i64>>,
}

impl From<TokenUpdateBody> for UpdateTokenRequest {
    fn from(body: TokenUpdateBody) -> Self {
        UpdateTokenRequest {
            description: body.description,
            expires_at: body.expires_at,
            max_usage_count: body.max_usage_count,
            delete_on_exhaust: body.delete_on_exhaust,
            page_title: body.page_title,
            welcome_message: body.welcome_message,
            allow_upload: body.allow_upload,
            upload_path: body.upload_path,
            allowed_file_types: body.allowed_file_types,
            max_file_size_mb: body.max_file_size_mb,
            filename_conflict_strategy: body.filename_conflict_strategy,
            allow_download: body.allow_download,
            downloadable_path: body.downloadable_path,
            allow_resumable_download: body.allow_resumable_download,
            max_total_upload_mb: body.max_total_upload_mb,
            download_bandwidth_limit_kbps: body.download_bandwidth_limit_kbps,
        }
    }
}
