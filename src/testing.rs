//! Store doubles shared by unit tests.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::metadata::store::{MetadataStore, NewUploadRecord, UploadRecord};
use crate::storage::backend::{ObjectStore, StoreError};

/// Object store that fails every write and counts attempts.
pub struct FailingStore {
    attempts: AtomicUsize,
    rejected: bool,
}

impl FailingStore {
    /// Fails with [`StoreError::Unavailable`].
    pub fn unavailable() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            rejected: false,
        }
    }

    /// Fails with [`StoreError::Rejected`].
    pub fn rejecting() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            rejected: true,
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ObjectStore for FailingStore {
    fn put(
        &self,
        _key: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.rejected {
                Err(StoreError::Rejected(anyhow::anyhow!("AccessDenied")))
            } else {
                Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
            }
        })
    }

    fn locator(&self, key: &str) -> String {
        format!("memory://down/{key}")
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Object store whose writes never complete.
pub struct HangingStore;

impl ObjectStore for HangingStore {
    fn put(
        &self,
        _key: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + '_>> {
        Box::pin(std::future::pending())
    }

    fn locator(&self, key: &str) -> String {
        format!("memory://hang/{key}")
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

/// Metadata store where every call fails.
pub struct BrokenIndex;

impl MetadataStore for BrokenIndex {
    fn insert(
        &self,
        _record: NewUploadRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<i64>> + Send + '_>> {
        Box::pin(async { Err(anyhow::anyhow!("database is locked")) })
    }

    fn list_all(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<UploadRecord>>> + Send + '_>> {
        Box::pin(async { Err(anyhow::anyhow!("unable to open database file")) })
    }

    fn count(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<u64>> + Send + '_>> {
        Box::pin(async { Err(anyhow::anyhow!("database is locked")) })
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async { Err(anyhow::anyhow!("database is locked")) })
    }
}
