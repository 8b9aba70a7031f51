//! Administrator authentication and account management.

pub mod service;

pub use service::{AdminAuthService, AdminLogin};
