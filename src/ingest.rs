//! Upload ingestion: store the bytes, then index them.
//!
//! [`IngestService::ingest`] runs the whole accept → store → index
//! sequence for one upload.  The metadata insert is only attempted after
//! the object store acknowledged the write, so an index record never points
//! at bytes that were not stored.  The reverse is not guaranteed: if the
//! insert fails after a successful write, the object is left in storage
//! without a record (an orphan) and the failure is reported as
//! [`GalleryError::MetadataCommitFailure`].  Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::errors::GalleryError;
use crate::metadata::store::{MetadataStore, NewUploadRecord};
use crate::metrics::{ORPHAN_OBJECTS_TOTAL, UPLOADS_TOTAL, UPLOAD_BYTES_TOTAL};
use crate::storage::backend::{ObjectStore, StoreError};

/// Prefix of generated names for uploads that arrive without a filename.
pub const FALLBACK_NAME_PREFIX: &str = "upload-";

/// Content type recorded when the client declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// The file part of an upload request, as extracted from the body.
#[derive(Debug, Clone, Default)]
pub struct UploadPayload {
    /// Client-supplied filename, if any.
    pub filename: Option<String>,
    /// Declared MIME type, if any.
    pub content_type: Option<String>,
    /// File bytes; `None` when the request carried no file.
    pub data: Option<Bytes>,
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    /// Public URL of the stored bytes.
    pub locator: String,
    /// Index id assigned to the new record.
    pub record_id: i64,
    /// Name the object was stored under.
    pub filename: String,
}

/// Choose the object key for an upload.
///
/// The client filename exactly as sent, unless it is blank, in which case
/// `upload-<unix millis>`.  Two unnamed uploads in the same millisecond get
/// the same key.
pub fn derive_object_key(filename: Option<&str>, now: DateTime<Utc>) -> String {
    match filename.filter(|name| !name.trim().is_empty()) {
        Some(name) => name.to_string(),
        None => format!("{FALLBACK_NAME_PREFIX}{}", now.timestamp_millis()),
    }
}

/// ISO-8601 UTC timestamp with millisecond precision.
pub fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Coordinates the object-store write and the metadata commit.
pub struct IngestService {
    storage: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    max_upload_bytes: u64,
    storage_timeout: Duration,
    metadata_timeout: Duration,
}

impl IngestService {
    /// Build a coordinator over the given stores.
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            storage,
            metadata,
            max_upload_bytes: config.max_upload_bytes,
            storage_timeout: Duration::from_secs(config.storage_timeout_secs),
            metadata_timeout: Duration::from_secs(config.metadata_timeout_secs),
        }
    }

    /// Largest accepted payload in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Store one upload and record it in the index.
    pub async fn ingest(&self, payload: UploadPayload) -> Result<IngestReceipt, GalleryError> {
        let result = self.run(payload).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        counter!(UPLOADS_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, payload: UploadPayload) -> Result<IngestReceipt, GalleryError> {
        let data = payload.data.ok_or(GalleryError::NoFileProvided)?;
        if data.len() as u64 > self.max_upload_bytes {
            return Err(GalleryError::PayloadTooLarge {
                limit: self.max_upload_bytes,
            });
        }

        let key = derive_object_key(payload.filename.as_deref(), Utc::now());
        let content_type = payload
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let size = data.len() as u64;

        let locator = tokio::time::timeout(
            self.storage_timeout,
            self.storage.put(&key, data, &content_type),
        )
        .await
        .unwrap_or_else(|_| {
            Err(StoreError::Unavailable(anyhow::anyhow!(
                "put timed out after {}s",
                self.storage_timeout.as_secs()
            )))
        })
        .map_err(GalleryError::ObjectStoreFailure)?;

        counter!(UPLOAD_BYTES_TOTAL).increment(size);

        // Timestamped at commit, after the store acknowledged the bytes.
        let record = NewUploadRecord {
            filename: key.clone(),
            locator: locator.clone(),
            created_at: iso8601(Utc::now()),
        };

        let inserted = tokio::time::timeout(self.metadata_timeout, self.metadata.insert(record))
            .await
            .unwrap_or_else(|_| {
                Err(anyhow::anyhow!(
                    "insert timed out after {}s",
                    self.metadata_timeout.as_secs()
                ))
            });

        let record_id = match inserted {
            Ok(id) => id,
            Err(source) => {
                counter!(ORPHAN_OBJECTS_TOTAL).increment(1);
                warn!(
                    key = %key,
                    locator = %locator,
                    backend = self.storage.name(),
                    "Object stored without an index record"
                );
                return Err(GalleryError::MetadataCommitFailure { locator, source });
            }
        };

        info!(
            id = record_id,
            key = %key,
            size,
            content_type = %content_type,
            "Inserted upload record"
        );

        Ok(IngestReceipt {
            locator,
            record_id,
            filename: key,
        })
    }
}
