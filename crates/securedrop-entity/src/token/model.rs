//! Token entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use securedrop_core::error::AppError;

use super::policy::TokenPolicy;
use super::status::TokenStatus;

/// An admin-issued capability granting scoped, metered guest access.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    /// Opaque numeric identifier.
    pub id: i64,
    /// Secret string handed to the guest.
    pub token_string: String,
    /// Admin-facing note.
    pub description: Option<String>,
    /// Stored status. Use [`Token::live_status`] for decisions.
    pub status: TokenStatus,
    /// When the token was created.
    pub created_at: DateTime<Utc>,
    /// When the token stops working, if ever.
    pub expires_at: Option<DateTime<Utc>>,
    /// Allowed transfers; `0` is unlimited.
    pub max_usage_count: i64,
    /// Transfers consumed so far.
    pub usage_count: i64,
    /// Remove the record once the last use is consumed.
    pub delete_on_exhaust: bool,
    /// Bytes uploaded through this token.
    pub uploaded_bytes: i64,
    /// Guest policy.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub policy: TokenPolicy,
}

impl Token {
    /// Status computed against the clock and usage counters.
    pub fn live_status(&self, now: DateTime<Utc>) -> TokenStatus {
        TokenStatus::evaluate(
            self.status,
            self.expires_at,
            self.usage_count,
            self.max_usage_count,
            now,
        )
    }

    /// Replace the stored status with the live one, for display.
    pub fn with_live_status(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.live_status(now);
        self
    }

    /// `Ok` if guests may use the token right now.
    pub fn ensure_active(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.live_status(now).ensure_active()
    }

    /// Uses left, `None` for unlimited tokens.
    pub fn remaining_uses(&self) -> Option<i64> {
        (self.max_usage_count > 0).then(|| (self.max_usage_count - self.usage_count).max(0))
    }
}

/// Data required to insert a token.
#[derive(Debug, Clone)]
pub struct NewToken {
    /// Freshly generated secret.
    pub token_string: String,
    /// Admin-facing note.
    pub description: Option<String>,
    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Allowed transfers; `0` is unlimited.
    pub max_usage_count: i64,
    /// Remove on exhaustion.
    pub delete_on_exhaust: bool,
    /// Guest policy.
    pub policy: TokenPolicy,
}
