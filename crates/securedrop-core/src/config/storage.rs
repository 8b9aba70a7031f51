//! Storage configuration.

use serde::{Deserialize, Serialize};

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// The single root every token path is resolved under.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Hard request body limit for uploads in bytes (default 1 GB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Read buffer size for streamed downloads in bytes.
    #[serde(default = "default_chunk_size")]
    pub download_chunk_size_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            max_upload_size_bytes: default_max_upload(),
            download_chunk_size_bytes: default_chunk_size(),
        }
    }
}

fn default_root_path() -> String {
    "./data/storage".to_string()
}

fn default_max_upload() -> u64 {
    1_073_741_824 // 1 GB
}

fn default_chunk_size() -> usize {
    65_536 // 64 KB
}
