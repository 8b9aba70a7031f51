//! JWT claims carried by admin and guest credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use securedrop_entity::token::TokenPolicy;

/// Audience of admin bearer credentials.
pub const ADMIN_AUDIENCE: &str = "admin";
/// Audience of guest session credentials.
pub const GUEST_AUDIENCE: &str = "guest";

/// Which principal a credential was issued to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// An authenticated administrator.
    Admin,
    /// A guest holding a token session.
    Guest,
}

/// Claims of an admin bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Subject: the admin ID.
    pub sub: i64,
    /// Username for log lines.
    pub username: String,
    /// Always [`ADMIN_AUDIENCE`].
    pub aud: String,
    /// Always [`CredentialKind::Admin`].
    pub kind: CredentialKind,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique credential ID.
    pub jti: Uuid,
}

impl AdminClaims {
    /// Returns the admin ID from the subject claim.
    pub fn admin_id(&self) -> i64 {
        self.sub
    }
}

/// Claims of a guest session credential.
///
/// The policy is frozen at login; edits to the token made afterwards do
/// not reach this session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestClaims {
    /// Subject: the token ID.
    pub sub: i64,
    /// Always [`GUEST_AUDIENCE`].
    pub aud: String,
    /// Always [`CredentialKind::Guest`].
    pub kind: CredentialKind,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique credential ID.
    pub jti: Uuid,
    /// Policy snapshot taken at login.
    pub policy: TokenPolicy,
}

impl GuestClaims {
    /// Returns the token ID from the subject claim.
    pub fn token_id(&self) -> i64 {
        self.sub
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}
