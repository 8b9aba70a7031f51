//! JWT validation for both credential kinds.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::de::DeserializeOwned;

use securedrop_core::config::AuthConfig;
use securedrop_core::error::AppError;

use super::claims::{ADMIN_AUDIENCE, AdminClaims, CredentialKind, GUEST_AUDIENCE, GuestClaims};

/// Validates signed credentials.
///
/// Each kind has its own validation with a pinned audience, so an admin
/// bearer is rejected on guest routes and the other way around.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation for admin bearers.
    admin_validation: Validation,
    /// Validation for guest sessions.
    guest_validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("admin_validation", &self.admin_validation)
            .field("guest_validation", &self.guest_validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            admin_validation: validation(ADMIN_AUDIENCE, config.jwt_leeway_seconds),
            guest_validation: validation(GUEST_AUDIENCE, config.jwt_leeway_seconds),
        }
    }

    /// Decodes and validates an admin bearer.
    pub fn decode_admin(&self, token: &str) -> Result<AdminClaims, AppError> {
        let claims: AdminClaims = self.decode_with(token, &self.admin_validation)?;
        if claims.kind != CredentialKind::Admin {
            return Err(AppError::unauthorized(
                "Invalid credential kind: expected admin",
            ));
        }
        Ok(claims)
    }

    /// Decodes and validates a guest session.
    pub fn decode_guest(&self, token: &str) -> Result<GuestClaims, AppError> {
        let claims: GuestClaims = self.decode_with(token, &self.guest_validation)?;
        if claims.kind != CredentialKind::Guest {
            return Err(AppError::unauthorized(
                "Invalid credential kind: expected guest session",
            ));
        }
        Ok(claims)
    }

    fn decode_with<T: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<T, AppError> {
        let token_data = decode::<T>(token, &self.decoding_key, validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::unauthorized("Credential has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    AppError::unauthorized("Credential is not valid for this endpoint")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::unauthorized("Invalid credential format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::unauthorized("Invalid credential signature")
                }
                _ => AppError::unauthorized(format!("Credential validation failed: {e}")),
            }
        })?;

        Ok(token_data.claims)
    }
}

fn validation(audience: &str, leeway_seconds: u64) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = leeway_seconds;
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "aud"]);
    validation
}
