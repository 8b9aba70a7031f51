//! Custom Axum extractors.

pub mod auth;
pub mod pagination;

pub use auth::{AdminUser, ClientIp, GuestUser};
pub use pagination::PaginationParams;
