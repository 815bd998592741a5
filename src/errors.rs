//! Gallery API error types.
//!
//! Every failure of the ingestion and listing paths ends up as a
//! [`GalleryError`].  The enum implements [`axum::response::IntoResponse`]
//! so handlers can simply return `Err(GalleryError::NoFileProvided)`; the
//! client receives `{"error": "<message>"}` while the underlying cause is
//! logged server-side.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::storage::backend::StoreError;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable failure message.
    pub error: String,
}

/// Failures surfaced by the upload and listing endpoints.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// The body could not be decoded as `multipart/form-data`.
    #[error("Malformed upload request: {message}")]
    MalformedRequest { message: String },

    /// No `file` field was present.
    #[error("No file uploaded or filepath missing")]
    NoFileProvided,

    /// The file is larger than the configured limit.
    #[error("File exceeds the maximum upload size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// The object store was unreachable or refused the write.  No index
    /// record was created.
    #[error("Failed to upload file")]
    ObjectStoreFailure(#[source] StoreError),

    /// The object was stored but the index insert failed, leaving an
    /// orphan object behind at `locator`.
    #[error("Failed to store image record")]
    MetadataCommitFailure {
        locator: String,
        #[source]
        source: anyhow::Error,
    },

    /// The index could not be read.
    #[error("Failed to fetch images")]
    ListingUnavailable(#[source] anyhow::Error),

    /// HTTP method not allowed for this route.
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl GalleryError {
    /// Stable machine-readable name, used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            GalleryError::MalformedRequest { .. } => "malformed_request",
            GalleryError::NoFileProvided => "no_file",
            GalleryError::PayloadTooLarge { .. } => "payload_too_large",
            GalleryError::ObjectStoreFailure(_) => "object_store_failure",
            GalleryError::MetadataCommitFailure { .. } => "metadata_commit_failure",
            GalleryError::ListingUnavailable(_) => "listing_unavailable",
            GalleryError::MethodNotAllowed => "method_not_allowed",
        }
    }

    /// Return the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GalleryError::MalformedRequest { .. } => StatusCode::BAD_REQUEST,
            GalleryError::NoFileProvided => StatusCode::BAD_REQUEST,
            GalleryError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GalleryError::ObjectStoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GalleryError::MetadataCommitFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GalleryError::ListingUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GalleryError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            GalleryError::ObjectStoreFailure(cause) => {
                error!(kind = self.kind(), "Upload error: {cause}");
            }
            GalleryError::MetadataCommitFailure { locator, source } => {
                error!(kind = self.kind(), %locator, "DB insert error: {source:#}");
            }
            GalleryError::ListingUnavailable(cause) => {
                error!(kind = self.kind(), "DB select error: {cause:#}");
            }
            _ => warn!(kind = self.kind(), status = status.as_u16(), "{self}"),
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
