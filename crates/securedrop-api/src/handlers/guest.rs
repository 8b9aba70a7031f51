//! Guest handlers: file listing, upload and ranged download.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use securedrop_core::error::AppError;
use securedrop_service::PreparedDownload;
use securedrop_service::exchange::RangeSelection;

use crate::dto::response::{FileEntryResponse, FileListResponse, UploadResponse};
use crate::error::ApiError;
use crate::extractors::GuestUser;
use crate::state::AppState;

/// GET /api/guest/files
pub async fn list_files(
    State(state): State<AppState>,
    guest: GuestUser,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state
        .file_gateway
        .list_files(&guest.context, &guest.session)
        .await?;

    Ok(Json(FileListResponse {
        files: files.into_iter().map(FileEntryResponse::from).collect(),
    }))
}

/// POST /api/guest/upload (multipart field `file`)
pub async fn upload(
    State(state): State<AppState>,
    guest: GuestUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(String::from)
            .ok_or_else(|| AppError::validation("The file field has no filename"))?;
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::validation("Multipart field 'file' is required"))?;

    let outcome = state
        .file_gateway
        .upload(&guest.context, &guest.session, &file_name, data)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// GET /api/guest/download/{filename}
pub async fn download(
    State(state): State<AppState>,
    guest: GuestUser,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let prepared = state
        .file_gateway
        .prepare_download(&guest.context, &guest.session, &filename, range_header(&headers))
        .await?;
    if prepared.selection == RangeSelection::Unsatisfiable {
        return Ok(unsatisfiable(&prepared));
    }

    let body = match state
        .file_gateway
        .open_download(&guest.context, &guest.session, &prepared)
        .await?
    {
        Some(stream) => Body::from_stream(stream),
        None => Body::empty(),
    };

    download_response(&prepared, guest.session.policy.allow_resumable_download, body)
}

/// HEAD /api/guest/download/{filename}. Never consumes a use.
pub async fn download_head(
    State(state): State<AppState>,
    guest: GuestUser,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let prepared = state
        .file_gateway
        .prepare_download(&guest.context, &guest.session, &filename, range_header(&headers))
        .await?;
    if prepared.selection == RangeSelection::Unsatisfiable {
        return Ok(unsatisfiable(&prepared));
    }

    download_response(
        &prepared,
        guest.session.policy.allow_resumable_download,
        Body::empty(),
    )
}

fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::RANGE).and_then(|v| v.to_str().ok())
}

fn download_response(
    prepared: &PreparedDownload,
    resumable: bool,
    body: Body,
) -> Result<Response, ApiError> {
    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, prepared.content_type())
        .header(header::CONTENT_LENGTH, prepared.content_length())
        .header(
            header::ACCEPT_RANGES,
            if resumable { "bytes" } else { "none" },
        )
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&prepared.meta.name),
        );

    builder = match prepared.selection {
        RangeSelection::Partial(range) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(
                header::CONTENT_RANGE,
                range.content_range(prepared.meta.size_bytes),
            ),
        _ => builder.status(StatusCode::OK),
    };

    builder
        .body(body)
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}

fn unsatisfiable(prepared: &PreparedDownload) -> Response {
    let mut response =
        ApiError(AppError::range_not_satisfiable("Requested range lies outside the file"))
            .into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", prepared.meta.size_bytes)) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::policy_violation("Upload exceeds the server size limit")
    } else {
        AppError::validation(format!("Multipart error: {}", err.body_text()))
    }
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
