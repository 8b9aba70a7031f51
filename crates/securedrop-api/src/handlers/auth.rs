//! Auth handlers: admin and guest login.

use axum::extract::State;
use axum::{Form, Json};

use crate::dto::request::{AdminLoginForm, GuestLoginRequest};
use crate::dto::response::{AdminLoginResponse, GuestLoginResponse};
use crate::dto::validate_body;
use crate::error::ApiError;
use crate::extractors::ClientIp;
use crate::state::AppState;
use securedrop_service::RequestContext;

/// POST /api/auth/admin/login
pub async fn admin_login(
    State(state): State<AppState>,
    Form(form): Form<AdminLoginForm>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    validate_body(&form)?;

    let login = state
        .admin_auth
        .login(&form.username, &form.password)
        .await?;

    Ok(Json(login.into()))
}

/// POST /api/guest/login
pub async fn guest_login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<GuestLoginRequest>,
) -> Result<Json<GuestLoginResponse>, ApiError> {
    validate_body(&req)?;

    let ctx = RequestContext::guest(ip);
    let login = state.session_issuer.login(&ctx, &req.token_string).await?;

    Ok(Json(login.into()))
}
