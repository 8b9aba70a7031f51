//! Core traits defined in `securedrop-core` and implemented by other crates.

pub mod storage;

pub use storage::StorageProvider;
