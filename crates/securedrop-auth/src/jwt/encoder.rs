//! JWT creation for admin bearers and guest sessions.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use securedrop_core::config::{AuthConfig, SessionConfig};
use securedrop_core::error::AppError;
use securedrop_entity::token::TokenPolicy;

use super::claims::{ADMIN_AUDIENCE, AdminClaims, CredentialKind, GUEST_AUDIENCE, GuestClaims};

/// A freshly signed credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCredential {
    /// The compact JWT.
    pub token: String,
    /// When it stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Creates signed admin and guest credentials.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Admin credential TTL in minutes.
    admin_ttl_minutes: i64,
    /// Guest session TTL in minutes.
    guest_ttl_minutes: i64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("admin_ttl_minutes", &self.admin_ttl_minutes)
            .field("guest_ttl_minutes", &self.guest_ttl_minutes)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth and session configuration.
    pub fn new(auth: &AuthConfig, session: &SessionConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
            admin_ttl_minutes: auth.admin_token_ttl_minutes as i64,
            guest_ttl_minutes: session.guest_ttl_minutes as i64,
        }
    }

    /// Signs an admin bearer credential.
    pub fn issue_admin(&self, admin_id: i64, username: &str) -> Result<IssuedCredential, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.admin_ttl_minutes);
        let claims = AdminClaims {
            sub: admin_id,
            username: username.to_string(),
            aud: ADMIN_AUDIENCE.to_string(),
            kind: CredentialKind::Admin,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode admin credential: {e}")))?;
        Ok(IssuedCredential { token, expires_at })
    }

    /// Signs a guest session credential with a frozen policy.
    pub fn issue_guest(
        &self,
        token_id: i64,
        policy: &TokenPolicy,
    ) -> Result<IssuedCredential, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.guest_ttl_minutes);
        let claims = GuestClaims {
            sub: token_id,
            aud: GUEST_AUDIENCE.to_string(),
            kind: CredentialKind::Guest,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            policy: policy.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode guest session: {e}")))?;
        Ok(IssuedCredential { token, expires_at })
    }
}
