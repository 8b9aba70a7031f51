//! Exchanges token strings for guest sessions and verifies them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use securedrop_auth::jwt::{JwtDecoder, JwtEncoder};
use securedrop_core::error::AppError;
use securedrop_database::repositories::TokenRepository;
use securedrop_entity::access_log::AccessAction;
use securedrop_entity::token::{Token, TokenPolicy};

use crate::access::AccessLogService;
use crate::context::RequestContext;

/// Result of a guest login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestLogin {
    /// The signed session credential.
    pub session_token: String,
    /// When the session ends.
    pub expires_at: DateTime<Utc>,
    /// The policy frozen into the session.
    pub policy: TokenPolicy,
}

/// A verified guest session.
#[derive(Debug, Clone)]
pub struct GuestSession {
    /// The token the session was opened with.
    pub token_id: i64,
    /// Policy frozen at login.
    pub policy: TokenPolicy,
    /// The token as read for this request.
    pub token: Token,
}

/// Issues and verifies guest sessions.
#[derive(Debug, Clone)]
pub struct SessionIssuer {
    /// Token repository.
    token_repo: Arc<TokenRepository>,
    /// Credential signer.
    encoder: Arc<JwtEncoder>,
    /// Credential verifier.
    decoder: Arc<JwtDecoder>,
    /// Access log.
    access_log: Arc<AccessLogService>,
}

impl SessionIssuer {
    /// Creates a new session issuer.
    pub fn new(
        token_repo: Arc<TokenRepository>,
        encoder: Arc<JwtEncoder>,
        decoder: Arc<JwtDecoder>,
        access_log: Arc<AccessLogService>,
    ) -> Self {
        Self {
            token_repo,
            encoder,
            decoder,
            access_log,
        }
    }

    /// Opens a session for a token string. Does not consume a use.
    pub async fn login(
        &self,
        ctx: &RequestContext,
        token_string: &str,
    ) -> Result<GuestLogin, AppError> {
        let token = self
            .token_repo
            .find_by_token_string(token_string.trim())
            .await?
            .ok_or_else(|| AppError::invalid_token("Invalid token"))?;

        token.ensure_active(Utc::now())?;

        let issued = self.encoder.issue_guest(token.id, &token.policy)?;
        info!(token_id = token.id, "Guest session opened");
        self.access_log
            .record(ctx, token.id, AccessAction::GuestLogin, None)
            .await;

        Ok(GuestLogin {
            session_token: issued.token,
            expires_at: issued.expires_at,
            policy: token.policy,
        })
    }

    /// Verifies a session credential and re-reads the token status.
    pub async fn authenticate(&self, bearer: &str) -> Result<GuestSession, AppError> {
        let claims = self.decoder.decode_guest(bearer)?;

        let token = self
            .token_repo
            .find_by_id(claims.token_id())
            .await?
            .ok_or_else(|| AppError::invalid_token("Token no longer exists"))?;

        token.ensure_active(Utc::now())?;

        Ok(GuestSession {
            token_id: token.id,
            policy: claims.policy,
            token,
        })
    }
}
