//! `POST /api/upload`: accept one media file.

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::errors::GalleryError;
use crate::ingest::UploadPayload;
use crate::AppState;

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Successful upload response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL of the stored media.
    pub url: String,
}

/// Pull the `file` field out of a multipart body.
///
/// Only the first `file` file part is used; later ones are skipped.  A
/// `file` part without a `filename` parameter is a form value, not a file,
/// and is ignored like any other field.  A body without a `file` field yields a payload
/// with no data, which ingestion reports as `NoFileProvided`.
pub async fn extract_upload(
    mut multipart: Multipart,
    limit: u64,
) -> Result<UploadPayload, GalleryError> {
    let mut payload = UploadPayload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if payload.data.is_some() {
            debug!("Ignoring extra '{FILE_FIELD}' field {:?}", field.file_name());
            continue;
        }
        // A part without a `filename` parameter is a plain form value.
        if field.file_name().is_none() {
            debug!("Ignoring '{FILE_FIELD}' form value without a filename");
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        payload = UploadPayload {
            filename,
            content_type,
            data: Some(data),
        };
    }

    Ok(payload)
}

fn multipart_error(err: MultipartError, limit: u64) -> GalleryError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GalleryError::PayloadTooLarge { limit }
    } else {
        GalleryError::MalformedRequest {
            message: err.body_text(),
        }
    }
}

/// Upload one media file and index it.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Gallery",
    operation_id = "UploadMedia",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Media stored and indexed", body = UploadResponse),
        (status = 400, description = "No file or malformed body", body = crate::errors::ErrorBody),
        (status = 405, description = "Method not allowed", body = crate::errors::ErrorBody),
        (status = 413, description = "File too large", body = crate::errors::ErrorBody),
        (status = 500, description = "Object store or index failure", body = crate::errors::ErrorBody)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "upload"))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, GalleryError> {
    let multipart = multipart.map_err(|rejection| GalleryError::MalformedRequest {
        message: rejection.body_text(),
    })?;

    let payload = extract_upload(multipart, state.ingest.max_upload_bytes()).await?;
    let receipt = state.ingest.ingest(payload).await?;

    Ok(Json(UploadResponse {
        url: receipt.locator,
    }))
}
