//! HTTP handlers for the gallery API.
//!
//! Each handler extracts its input, delegates to the matching service on
//! [`crate::AppState`], and renders JSON.  Failures are returned as
//! [`crate::errors::GalleryError`], which renders itself.

pub mod list;
pub mod upload;

use crate::errors::GalleryError;

/// Fallback for any method a gallery route does not serve.
pub async fn method_not_allowed() -> GalleryError {
    GalleryError::MethodNotAllowed
}
