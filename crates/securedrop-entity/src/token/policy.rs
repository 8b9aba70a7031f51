//! Token policy: the fields frozen into a guest session at login.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use securedrop_core::error::AppError;
use securedrop_core::traits::storage::WriteMode;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Upper bound for the MiB and KiB/s policy limits.
pub const MAX_POLICY_LIMIT: i64 = 1 << 30;

/// What an upload does when the destination name already exists.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FilenameConflictStrategy {
    /// Store under `{stem}_{n}{ext}`.
    #[default]
    Rename,
    /// Replace the existing file.
    Overwrite,
    /// Refuse the upload with a conflict.
    Reject,
}

impl FilenameConflictStrategy {
    /// Return the strategy as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rename => "rename",
            Self::Overwrite => "overwrite",
            Self::Reject => "reject",
        }
    }
}

impl From<FilenameConflictStrategy> for WriteMode {
    fn from(strategy: FilenameConflictStrategy) -> Self {
        match strategy {
            FilenameConflictStrategy::Rename => WriteMode::Rename,
            FilenameConflictStrategy::Overwrite => WriteMode::Overwrite,
            FilenameConflictStrategy::Reject => WriteMode::CreateNew,
        }
    }
}

impl fmt::Display for FilenameConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilenameConflictStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rename" => Ok(Self::Rename),
            "overwrite" => Ok(Self::Overwrite),
            "reject" => Ok(Self::Reject),
            _ => Err(AppError::validation(format!(
                "Invalid conflict strategy: '{s}'. Expected one of: rename, overwrite, reject"
            ))),
        }
    }
}

/// Everything a guest session is allowed to do.
///
/// A copy of this struct is embedded in the session credential at login;
/// later edits to the token do not reach sessions already issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TokenPolicy {
    /// Heading shown on the guest page.
    pub page_title: Option<String>,
    /// Message shown on the guest page.
    pub welcome_message: Option<String>,
    /// Whether uploads are allowed.
    pub allow_upload: bool,
    /// Upload directory relative to the storage root.
    pub upload_path: Option<String>,
    /// Accepted extensions without the dot, lowercase. Empty accepts all.
    #[sqlx(json)]
    pub allowed_file_types: Vec<String>,
    /// Per-file size limit in MiB.
    pub max_file_size_mb: Option<i64>,
    /// Behaviour when the upload name is taken.
    pub filename_conflict_strategy: FilenameConflictStrategy,
    /// Whether downloads are allowed.
    pub allow_download: bool,
    /// Download directory relative to the storage root.
    pub downloadable_path: Option<String>,
    /// Whether byte-range requests are honoured.
    pub allow_resumable_download: bool,
    /// Cumulative upload quota in MiB.
    pub max_total_upload_mb: Option<i64>,
    /// Download throttle in KiB/s.
    pub download_bandwidth_limit_kbps: Option<i64>,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            page_title: None,
            welcome_message: None,
            allow_upload: false,
            upload_path: None,
            allowed_file_types: Vec::new(),
            max_file_size_mb: None,
            filename_conflict_strategy: FilenameConflictStrategy::Rename,
            allow_download: false,
            downloadable_path: None,
            allow_resumable_download: true,
            max_total_upload_mb: None,
            download_bandwidth_limit_kbps: None,
        }
    }
}

impl TokenPolicy {
    /// Canonicalize user input: trims paths and lowercases extensions.
    pub fn normalize(&mut self) {
        let mut types: Vec<String> = self
            .allowed_file_types
            .iter()
            .map(|t| normalize_extension(t))
            .filter(|t| !t.is_empty())
            .collect();
        types.sort();
        types.dedup();
        self.allowed_file_types = types;

        self.upload_path = normalize_dir(self.upload_path.take());
        self.downloadable_path = normalize_dir(self.downloadable_path.take());
    }

    /// Reject values no request could ever satisfy safely.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(path) = &self.upload_path {
            validate_relative_dir("upload_path", path)?;
        }
        if let Some(path) = &self.downloadable_path {
            validate_relative_dir("downloadable_path", path)?;
        }
        for (field, value) in [
            ("max_file_size_mb", self.max_file_size_mb),
            ("max_total_upload_mb", self.max_total_upload_mb),
            ("download_bandwidth_limit_kbps", self.download_bandwidth_limit_kbps),
        ] {
            if matches!(value, Some(v) if v <= 0 || v > MAX_POLICY_LIMIT) {
                return Err(AppError::validation(format!(
                    "{field} must be between 1 and {MAX_POLICY_LIMIT}"
                )));
            }
        }
        Ok(())
    }

    /// Whether `filename` has an accepted extension.
    pub fn allows_file_type(&self, filename: &str) -> bool {
        if self.allowed_file_types.is_empty() {
            return true;
        }
        match Path::new(filename).extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let ext = ext.to_lowercase();
                self.allowed_file_types.iter().any(|t| *t == ext)
            }
            None => false,
        }
    }

    /// Per-file size limit in bytes.
    pub fn max_file_size_bytes(&self) -> Option<u64> {
        self.max_file_size_mb.map(|mb| to_bytes(mb, BYTES_PER_MB))
    }

    /// Cumulative upload quota in bytes.
    pub fn max_total_upload_bytes(&self) -> Option<u64> {
        self.max_total_upload_mb.map(|mb| to_bytes(mb, BYTES_PER_MB))
    }

    /// Download throttle in bytes per second.
    pub fn download_bytes_per_second(&self) -> Option<u64> {
        self.download_bandwidth_limit_kbps
            .filter(|kbps| *kbps > 0)
            .map(|kbps| to_bytes(kbps, 1024))
    }

    /// Upload directory, `""` meaning the storage root.
    pub fn upload_dir(&self) -> &str {
        self.upload_path.as_deref().unwrap_or("")
    }

    /// Download directory, `""` meaning the storage root.
    pub fn download_dir(&self) -> &str {
        self.downloadable_path.as_deref().unwrap_or("")
    }
}

/// Saturates instead of wrapping for limits stored before the bound existed.
fn to_bytes(value: i64, unit: u64) -> u64 {
    (value.max(0) as u64).saturating_mul(unit)
}

/// `".PDF"` and `"pdf"` both become `"pdf"`.
pub fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}

fn normalize_dir(path: Option<String>) -> Option<String> {
    path.map(|p| p.trim().trim_end_matches(['/', '\\']).to_string())
        .filter(|p| !p.is_empty())
}

/// Check that `path` stays inside whatever root it is joined to.
pub fn validate_relative_dir(field: &str, path: &str) -> Result<(), AppError> {
    if path.contains('\0') || path.contains('\\') {
        return Err(AppError::validation(format!(
            "{field} contains forbidden characters"
        )));
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AppError::validation(format!(
                    "{field} must be a relative path inside the storage root"
                )));
            }
        }
    }
    Ok(())
}
