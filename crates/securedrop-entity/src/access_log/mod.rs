//! Per-token access log.

pub mod model;

pub use model::{AccessAction, AccessLogEntry, CreateAccessLogEntry};
