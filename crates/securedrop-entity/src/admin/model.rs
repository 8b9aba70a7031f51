//! Admin entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An administrator allowed to mint and manage tokens.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admin {
    /// Row identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Argon2id PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new admin.
#[derive(Debug, Clone)]
pub struct CreateAdmin {
    /// Login name.
    pub username: String,
    /// Pre-hashed password.
    pub password_hash: String,
}
