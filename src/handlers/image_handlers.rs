//! HTTP handlers for image upload, listing and deletion.
//! Storage concerns are delegated to `ImageService`.

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    config::{parse_bool, parse_quality},
    errors::AppError,
    handlers::auth_handlers::AdminSession,
    models::{
        object::StoredObject,
        response::{DataResponse, SuccessResponse},
    },
    services::image_service::{
        ALLOWED_MIME_TYPES, DEFAULT_LIST_LIMIT, UploadError, UploadOptions, UploadRequest,
    },
    state::AppState,
};

/// Query params accepted by `GET /api/images`.
#[derive(Debug, Deserialize)]
pub struct ListImagesQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Body of `DELETE /api/images`: a single `key` or a batch of `keys`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteImagesReq {
    pub key: Option<String>,
    pub keys: Option<Vec<String>>,
}

/// Upload defaults exposed to the UI.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfigResponse {
    pub max_file_size: usize,
    pub default_quality: u8,
    pub use_hash_name: bool,
    pub enable_webp_compression: bool,
    pub allowed_types: &'static [&'static str],
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::bad_request(format!("File too large: exceeds the {} byte limit", limit))
    } else {
        AppError::bad_request("Invalid multipart body").with_details(err.body_text())
    }
}

/// `POST /api/upload`: multipart form with `file`, `quality`,
/// `useHashName` and `enableWebpCompression`.
pub async fn upload_image(
    State(state): State<AppState>,
    _session: AdminSession,
    mut multipart: Multipart,
) -> Result<Json<DataResponse<StoredObject>>, AppError> {
    let limit = state.images.defaults().max_file_size;
    let mut file: Option<(Bytes, String, String)> = None;
    let mut options = UploadOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                // Browsers send an empty, unnamed part when nothing was picked.
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                let filename = if filename.is_empty() {
                    "upload".to_string()
                } else {
                    filename
                };
                file = Some((bytes, mime_type, filename));
            }
            "quality" => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                if !text.trim().is_empty() {
                    let quality =
                        parse_quality(&text).ok_or(UploadError::InvalidQuality(text))?;
                    options.quality = Some(quality);
                }
            }
            "useHashName" => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                options.use_hash_name = parse_bool(&text);
            }
            "enableWebpCompression" => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                options.compress = parse_bool(&text);
            }
            _ => {}
        }
    }

    let (bytes, mime_type, filename) = file.ok_or(UploadError::MissingFile)?;
    let stored = state
        .images
        .upload(UploadRequest {
            bytes,
            mime_type,
            filename,
            options,
        })
        .await?;

    Ok(Json(DataResponse::ok(stored)))
}

/// `GET /api/images?limit=&offset=`
pub async fn list_images(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(q): Query<ListImagesQuery>,
) -> Result<Json<DataResponse<Vec<StoredObject>>>, AppError> {
    let limit = q.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let offset = q.offset.unwrap_or(0);
    let objects = state.images.list(offset, limit).await?;
    Ok(Json(DataResponse::ok(objects)))
}

/// `DELETE /api/images` with `{ "key": ... }` or `{ "keys": [...] }`.
pub async fn delete_images(
    State(state): State<AppState>,
    _session: AdminSession,
    Json(body): Json<DeleteImagesReq>,
) -> Result<Json<SuccessResponse>, AppError> {
    if let Some(keys) = body.keys {
        let deleted = state.images.delete_many(&keys).await;
        return Ok(Json(SuccessResponse::deleted(deleted)));
    }

    let key = body.key.ok_or(UploadError::MissingKey)?;
    state.images.delete(&key).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `GET /api/config`
pub async fn upload_config(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Json<UploadConfigResponse> {
    let defaults = state.images.defaults();
    Json(UploadConfigResponse {
        max_file_size: defaults.max_file_size,
        default_quality: defaults.quality,
        use_hash_name: defaults.use_hash_name,
        enable_webp_compression: defaults.enable_webp_compression,
        allowed_types: &ALLOWED_MIME_TYPES,
    })
}
