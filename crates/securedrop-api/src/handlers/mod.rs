//! HTTP request handlers.

pub mod auth;
pub mod guest;
pub mod health;
pub mod tokens;
