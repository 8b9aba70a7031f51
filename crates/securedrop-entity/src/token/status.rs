//! Token status state machine.
//!
//! `active` is the only usable state; `exhausted`, `expired` and `revoked`
//! are terminal. The stored column only records facts that cannot be
//! recomputed (revocation and exhaustion); everything else is derived at
//! read time by [`TokenStatus::evaluate`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use securedrop_core::error::{AppError, UnavailableReason};

/// Status of an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Usable by guests.
    Active,
    /// Usage count reached the configured maximum.
    Exhausted,
    /// `expires_at` has passed.
    Expired,
    /// Revoked by an administrator.
    Revoked,
}

impl TokenStatus {
    /// Compute the live status of a token.
    ///
    /// Revocation always wins. A persisted `exhausted` stays exhausted even
    /// if an admin later raises the limit, since the state is terminal.
    pub fn evaluate(
        stored: TokenStatus,
        expires_at: Option<DateTime<Utc>>,
        usage_count: i64,
        max_usage_count: i64,
        now: DateTime<Utc>,
    ) -> TokenStatus {
        if stored != TokenStatus::Active {
            return stored;
        }
        if max_usage_count > 0 && usage_count >= max_usage_count {
            return TokenStatus::Exhausted;
        }
        match expires_at {
            Some(at) if at <= now => TokenStatus::Expired,
            _ => TokenStatus::Active,
        }
    }

    /// Whether guests may use a token in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// The guest-facing reason for a terminal state.
    pub fn unavailable_reason(&self) -> Option<UnavailableReason> {
        match self {
            Self::Active => None,
            Self::Exhausted => Some(UnavailableReason::Exhausted),
            Self::Expired => Some(UnavailableReason::Expired),
            Self::Revoked => Some(UnavailableReason::Revoked),
        }
    }

    /// `Ok` when active, otherwise the matching `TokenUnavailable` error.
    pub fn ensure_active(&self) -> Result<(), AppError> {
        match self.unavailable_reason() {
            None => Ok(()),
            Some(reason) => Err(AppError::token_unavailable(reason)),
        }
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Exhausted => "exhausted",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "exhausted" => Ok(Self::Exhausted),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            _ => Err(AppError::validation(format!(
                "Invalid token status: '{s}'. Expected one of: active, exhausted, expired, revoked"
            ))),
        }
    }
}
