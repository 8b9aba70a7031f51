//! Admin token management handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use securedrop_core::error::AppError;
use securedrop_core::types::pagination::PageResponse;

use crate::dto::request::{TokenCreateBody, TokenUpdateBody};
use crate::dto::response::{AccessLogResponse, DownloadableDirsResponse, TokenResponse};
use crate::dto::validate_body;
use crate::error::ApiError;
use crate::extractors::{AdminUser, PaginationParams};
use crate::state::AppState;

/// GET /api/admin/tokens
pub async fn list_tokens(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PageResponse<TokenResponse>>, ApiError> {
    let page = params.into_page_request(state.config.tokens.default_page_size);
    let tokens = state.token_service.list(page).await?;
    Ok(Json(tokens.map(TokenResponse::from)))
}

/// POST /api/admin/tokens
pub async fn create_token(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<TokenCreateBody>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    validate_body(&body)?;
    let token = state.token_service.create(&admin, body.into()).await?;
    Ok((StatusCode::CREATED, Json(token.into())))
}

/// GET /api/admin/tokens/{id}
pub async fn get_token(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.token_service.get(id).await?;
    Ok(Json(token.into()))
}

/// PUT /api/admin/tokens/{id}
pub async fn update_token(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<TokenUpdateBody>,
) -> Result<Json<TokenResponse>, ApiError> {
    if body.token_string.is_some() {
        return Err(AppError::validation("token_string cannot be changed").into());
    }
    validate_body(&body)?;

    let token = state.token_service.update(&admin, id, body.into()).await?;
    Ok(Json(token.into()))
}

/// DELETE /api/admin/tokens/{id}
pub async fn delete_token(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.token_service.delete(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/tokens/{id}/revoke
pub async fn revoke_token(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.token_service.revoke(&admin, id).await?;
    Ok(Json(token.into()))
}

/// GET /api/admin/tokens/downloadable-dirs
pub async fn downloadable_dirs(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<DownloadableDirsResponse>, ApiError> {
    let directories = state.token_service.downloadable_dirs().await?;
    Ok(Json(DownloadableDirsResponse { directories }))
}

/// GET /api/admin/tokens/{id}/logs
pub async fn token_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PageResponse<AccessLogResponse>>, ApiError> {
    let page = params.into_page_request(state.config.tokens.default_page_size);
    let logs = state.token_service.logs(id, page).await?;
    Ok(Json(logs.map(AccessLogResponse::from)))
}
