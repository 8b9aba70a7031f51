//! # securedrop-database
//!
//! SQLite connection management and concrete repository implementations
//! for tokens, admins and the access log.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use sqlx::SqlitePool;
