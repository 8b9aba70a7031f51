//! # securedrop-storage
//!
//! The guarded local filesystem store behind the file exchange. All paths
//! are confined to a single configured root.

pub mod providers;

pub use providers::LocalStorageProvider;
pub use providers::local::{check_file_name, mime_from_path};
