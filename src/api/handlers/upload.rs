use crate::AppState;
use crate::api::error::AppError;
use crate::models::AssetRecord;
use crate::services::sniffer::MediaField;
use crate::utils::auth::Principal;
use axum::{
    Extension, Json,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header::CONTENT_LENGTH},
};
use futures::TryStreamExt;
use std::io;
use tokio_util::io::StreamReader;
use tracing::info;
use uuid::Uuid;

/// Allowance for multipart framing on top of the per-field cap
pub const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Largest request body accepted for `field`
pub fn body_limit(field: MediaField, state: &AppState) -> usize {
    let cap = field.size_limit(&state.config).saturating_add(MULTIPART_OVERHEAD);
    usize::try_from(cap).unwrap_or(usize::MAX)
}

#[utoipa::path(
    post,
    path = "/api/thumbnail_upload/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video record ID")
    ),
    request_body(content = String, description = "Multipart form with a `thumbnail` file part (JPEG or PNG)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Thumbnail stored and attached", body = AssetRecord),
        (status = 400, description = "Invalid ID, malformed form or unsupported type"),
        (status = 401, description = "Missing token or not the owner"),
        (status = 413, description = "Thumbnail exceeds the size cap"),
        (status = 500, description = "Storage, IO or persistence failure")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "uploads"
)]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AssetRecord>, AppError> {
    handle_upload(state, MediaField::Thumbnail, principal, video_id, &headers, multipart).await
}

#[utoipa::path(
    post,
    path = "/api/video_upload/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video record ID")
    ),
    request_body(content = String, description = "Multipart form with a `video` file part (MP4)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video remuxed, stored and attached", body = AssetRecord),
        (status = 400, description = "Invalid ID, malformed form or unsupported type"),
        (status = 401, description = "Missing token or not the owner"),
        (status = 413, description = "Video exceeds the size cap"),
        (status = 500, description = "Analysis, transcode, storage or persistence failure")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "uploads"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AssetRecord>, AppError> {
    handle_upload(state, MediaField::Video, principal, video_id, &headers, multipart).await
}

async fn handle_upload(
    state: AppState,
    field: MediaField,
    principal: Principal,
    video_id: String,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AssetRecord>, AppError> {
    let asset_id = Uuid::parse_str(&video_id)
        .map_err(|_| AppError::InvalidIdentifier(format!("'{}' is not a valid video ID", video_id)))?;

    let cap = field.size_limit(&state.config);
    if let Some(declared) = content_length(headers) {
        if declared > cap.saturating_add(MULTIPART_OVERHEAD) {
            return Err(AppError::PayloadTooLarge(format!(
                "declared body of {} bytes exceeds the {} cap of {} bytes",
                declared,
                field.form_name(),
                cap
            )));
        }
    }

    let mut multipart = multipart.map_err(|e| AppError::MalformedRequest(e.body_text()))?;

    info!(
        "Received {} upload for video {} from user {}",
        field.form_name(),
        asset_id,
        principal.id
    );

    let result: Result<AssetRecord, AppError> = async {
        state.upload_service.authorize(asset_id, &principal).await?;

        while let Some(part) = multipart.next_field().await.map_err(map_multipart_error)? {
            if part.name() != Some(field.form_name()) {
                continue;
            }
            let reader = StreamReader::new(part.map_err(multipart_io_error));
            return state
                .upload_service
                .ingest(field, asset_id, &principal, reader)
                .await;
        }

        Err(AppError::MalformedRequest(format!(
            "form has no '{}' file part",
            field.form_name()
        )))
    }
    .await;

    match result {
        Ok(record) => Ok(Json(record)),
        Err(e) => {
            // Oversized and unauthorized bodies are not read to the end
            if !matches!(e, AppError::PayloadTooLarge(_) | AppError::AuthFailure(_)) {
                while let Ok(Some(mut part)) = multipart.next_field().await {
                    while let Ok(Some(_)) = part.chunk().await {}
                }
            }
            Err(e)
        }
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn map_multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::MalformedRequest(e.body_text())
    }
}

fn multipart_io_error(e: MultipartError) -> io::Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        io::Error::new(io::ErrorKind::FileTooLarge, e.body_text())
    } else {
        io::Error::other(e.body_text())
    }
}
