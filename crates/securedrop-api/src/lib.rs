//! # securedrop-api
//!
//! HTTP API layer for SecureDrop Exchange built on Axum.
//!
//! Provides the admin and guest REST endpoints, middleware (CORS, request
//! logging), extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state};
pub use error::{ApiError, ApiErrorResponse};
pub use state::AppState;
