//! Read side of the gallery: the full index, newest first.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::GalleryError;
use crate::metadata::store::{MetadataStore, UploadRecord};

/// Pass-through over [`MetadataStore::list_all`].
///
/// No filtering or pagination; either the whole index is returned or the
/// call fails with [`GalleryError::ListingUnavailable`].
pub struct ListingService {
    metadata: Arc<dyn MetadataStore>,
    timeout: Duration,
}

impl ListingService {
    pub fn new(metadata: Arc<dyn MetadataStore>, timeout: Duration) -> Self {
        Self { metadata, timeout }
    }

    pub async fn list(&self) -> Result<Vec<UploadRecord>, GalleryError> {
        tokio::time::timeout(self.timeout, self.metadata.list_all())
            .await
            .unwrap_or_else(|_| {
                Err(anyhow::anyhow!(
                    "listing timed out after {}s",
                    self.timeout.as_secs()
                ))
            })
            .map_err(GalleryError::ListingUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::sqlite::SqliteMetadataStore;
    use crate::metadata::store::NewUploadRecord;
    use crate::testing::BrokenIndex;

    fn record(name: &str) -> NewUploadRecord {
        NewUploadRecord {
            filename: name.to_string(),
            locator: format!("memory://g/{name}"),
            created_at: "2026-10-18T10:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_empty() {
        let store = Arc::new(SqliteMetadataStore::new(":memory:").unwrap());
        let service = ListingService::new(store, Duration::from_secs(5));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_repeatable() {
        let store = Arc::new(SqliteMetadataStore::new(":memory:").unwrap());
        store.insert(record("a.png")).await.unwrap();
        store.insert(record("b.png")).await.unwrap();
        let service = ListingService::new(store, Duration::from_secs(5));

        let first = service.list().await.unwrap();
        let second = service.list().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].filename, "b.png");
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let service = ListingService::new(Arc::new(BrokenIndex), Duration::from_secs(5));
        let err = service.list().await.unwrap_err();
        assert!(matches!(err, GalleryError::ListingUnavailable(_)));
    }
}
