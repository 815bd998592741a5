//! SnapStore library -- media upload and gallery index service.
//!
//! This crate accepts media uploads over HTTP, writes the bytes to an
//! object store, and records each upload in a SQLite index that the gallery
//! listing is served from.

use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod ingest;
pub mod listing;
pub mod metadata;
pub mod metrics;
pub mod server;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::Config;
use crate::ingest::IngestService;
use crate::listing::ListingService;
use crate::metadata::store::MetadataStore;
use crate::storage::backend::ObjectStore;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Metadata index.
    pub metadata: Arc<dyn MetadataStore>,
    /// Object storage backend.
    pub storage: Arc<dyn ObjectStore>,
    /// Upload pipeline over `storage` and `metadata`.
    pub ingest: IngestService,
    /// Read path over `metadata`.
    pub listing: ListingService,
}

impl AppState {
    /// Wire the services onto the given stores.
    pub fn new(
        config: Config,
        storage: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        let ingest = IngestService::new(storage.clone(), metadata.clone(), &config.ingest);
        let listing = ListingService::new(
            metadata.clone(),
            Duration::from_secs(config.ingest.metadata_timeout_secs),
        );
        Self {
            config,
            metadata,
            storage,
            ingest,
            listing,
        }
    }
}
