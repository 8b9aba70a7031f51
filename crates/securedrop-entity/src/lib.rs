//! # securedrop-entity
//!
//! Domain entity models for SecureDrop Exchange. Every struct in this crate
//! represents a database table row or a domain value object. Database
//! entities derive `sqlx::FromRow`.

pub mod access_log;
pub mod admin;
pub mod token;
