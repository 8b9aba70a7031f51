//! Per-token access log.

pub mod service;

pub use service::AccessLogService;
