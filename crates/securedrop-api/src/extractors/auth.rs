//! Credential extractors: pull the bearer from the Authorization header,
//! validate it for the right audience, and inject the request context.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use securedrop_core::error::AppError;
use securedrop_service::{GuestSession, RequestContext};

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub RequestContext);

impl std::ops::Deref for AdminUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.admin_auth.authenticate(token).await?;

        Ok(AdminUser(RequestContext::admin(
            claims.admin_id(),
            claims.username,
            client_ip(parts, &state.config.server.trusted_proxies),
        )))
    }
}

/// A guest holding a live session.
#[derive(Debug, Clone)]
pub struct GuestUser {
    /// Session with the frozen policy and the freshly read token.
    pub session: GuestSession,
    /// Context for access logging.
    pub context: RequestContext,
}

impl FromRequestParts<AppState> for GuestUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let session = state.session_issuer.authenticate(token).await?;

        Ok(GuestUser {
            session,
            context: RequestContext::guest(client_ip(parts, &state.config.server.trusted_proxies)),
        })
    }
}

/// Best-effort client address.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(
            parts,
            &state.config.server.trusted_proxies,
        )))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))
}

/// The socket peer, or the nearest untrusted `X-Forwarded-For` hop when the
/// peer is a configured proxy.
fn client_ip(parts: &Parts, trusted_proxies: &[String]) -> Option<String> {
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())?;

    if !is_trusted(&peer, trusted_proxies) {
        return Some(peer.to_string());
    }

    let forwarded = parts
        .headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter_map(|hop| hop.parse::<IpAddr>().ok())
        .collect::<Vec<_>>();

    let client = forwarded
        .iter()
        .rev()
        .find(|hop| !is_trusted(hop, trusted_proxies))
        .or(forwarded.first())
        .copied()
        .unwrap_or(peer);
    Some(client.to_string())
}

fn is_trusted(ip: &IpAddr, trusted_proxies: &[String]) -> bool {
    trusted_proxies
        .iter()
        .any(|t| t.trim().parse::<IpAddr>().is_ok_and(|t| t == *ip))
}
