//! `GET /api/list`: the gallery index, newest first.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::GalleryError;
use crate::metadata::store::UploadRecord;
use crate::AppState;

/// One gallery entry on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ImageEntry {
    /// Original or generated filename.
    pub filename: String,
    /// Public URL of the media.
    pub s3url: String,
    /// ISO-8601 upload timestamp.
    pub date: String,
}

impl From<UploadRecord> for ImageEntry {
    fn from(record: UploadRecord) -> Self {
        Self {
            filename: record.filename,
            s3url: record.locator,
            date: record.created_at,
        }
    }
}

/// Listing response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse {
    /// Every upload, newest first.
    pub images: Vec<ImageEntry>,
}

/// List every uploaded media item.
#[utoipa::path(
    get,
    path = "/api/list",
    tag = "Gallery",
    operation_id = "ListMedia",
    responses(
        (status = 200, description = "Full index, newest first", body = ListResponse),
        (status = 405, description = "Method not allowed", body = crate::errors::ErrorBody),
        (status = 500, description = "Index unavailable", body = crate::errors::ErrorBody)
    )
)]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse>, GalleryError> {
    let records = state.listing.list().await?;
    Ok(Json(ListResponse {
        images: records.into_iter().map(ImageEntry::from).collect(),
    }))
}
