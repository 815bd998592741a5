//! In-memory storage backend.
//!
//! Objects are held in a `tokio::sync::RwLock<HashMap<...>>`.  Nothing
//! survives a restart; this backend exists for development and tests.

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::backend::{join_locator, ObjectStore, StoreError};

/// A stored object's bytes and declared content type.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Raw bytes of the object.
    pub data: Bytes,
    /// MIME type supplied with the write.
    pub content_type: String,
}

/// In-memory object store.
pub struct MemoryBackend {
    /// Locator prefix.
    base_url: String,
    /// key -> object.
    objects: tokio::sync::RwLock<HashMap<String, StoredObject>>,
}

impl MemoryBackend {
    /// Create an empty backend whose locators start with `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the object stored under `key`.
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Fetch the object a locator points at, if the locator belongs to
    /// this backend.
    pub async fn resolve(&self, locator: &str) -> Option<StoredObject> {
        let objects = self.objects.read().await;
        objects
            .keys()
            .find(|key| self.locator(key) == locator)
            .and_then(|key| objects.get(key).cloned())
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

impl ObjectStore for MemoryBackend {
    fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + '_>> {
        let key = key.to_string();
        let content_type = content_type.to_string();
        Box::pin(async move {
            let locator = self.locator(&key);
            self.objects
                .write()
                .await
                .insert(key, StoredObject { data, content_type });
            Ok(locator)
        })
    }

    fn locator(&self, key: &str) -> String {
        join_locator(&self.base_url, key)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_resolve_locator() {
        let backend = MemoryBackend::new("memory://gallery");
        let locator = backend
            .put("snap 1.png", Bytes::from_static(b"\x89PNG"), "image/png")
            .await
            .unwrap();
        assert_eq!(locator, "memory://gallery/snap%201.png");

        let stored = backend.resolve(&locator).await.unwrap();
        assert_eq!(stored.data, Bytes::from_static(b"\x89PNG"));
        assert_eq!(stored.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_same_key_overwrites() {
        let backend = MemoryBackend::new("memory://gallery");
        backend
            .put("a.jpg", Bytes::from_static(b"one"), "image/jpeg")
            .await
            .unwrap();
        backend
            .put("a.jpg", Bytes::from_static(b"two"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(backend.len().await, 1);
        assert_eq!(backend.get("a.jpg").await.unwrap().data, Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn test_resolve_foreign_locator() {
        let backend = MemoryBackend::new("memory://gallery");
        assert!(backend.resolve("https://elsewhere/a.jpg").await.is_none());
    }
}
