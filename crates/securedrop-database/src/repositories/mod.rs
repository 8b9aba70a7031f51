//! Repository implementations for all persisted entities.

pub mod access_log;
pub mod admin;
pub mod token;

pub use access_log::AccessLogRepository;
pub use admin::AdminRepository;
pub use token::{ConsumeOutcome, TokenRepository};
