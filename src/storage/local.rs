//! Local filesystem storage backend.
//!
//! Objects are stored as flat files under a configurable root directory.
//! The object key is used directly as a relative path, and locators are
//! built from a configured public base URL (the server publishes the root
//! directory under `/media`).
//!
//! All writes follow crash-only design: write to temp file, fsync, rename.

use bytes::Bytes;
use std::future::Future;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use tracing::debug;

use super::backend::{join_locator, ObjectStore, StoreError};

/// Stores objects on the local filesystem.
pub struct LocalBackend {
    /// Root directory for all stored objects.
    root: PathBuf,
    /// Locator prefix.
    public_base_url: String,
}

impl LocalBackend {
    /// Create a new `LocalBackend` rooted at `root`.
    ///
    /// The directory will be created if it does not exist.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        // Also create the .tmp directory for atomic writes.
        std::fs::create_dir_all(root.join(".tmp"))?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into(),
        })
    }

    /// Root directory objects are written under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a file path below the root.
    ///
    /// Absolute keys, `..` components, and keys aimed at the temp
    /// directory are refused.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let mut components = relative.components().peekable();
        if components.peek().is_none() {
            return Err(StoreError::Rejected(anyhow::anyhow!("empty object key")));
        }
        for component in components {
            match component {
                Component::Normal(part) if part != ".tmp" => {}
                _ => {
                    return Err(StoreError::Rejected(anyhow::anyhow!(
                        "object key escapes storage root: {key}"
                    )))
                }
            }
        }
        Ok(self.root.join(relative))
    }

    /// Generate a temp file path under .tmp/ for atomic writes.
    fn temp_path(&self) -> PathBuf {
        let id = uuid::Uuid::new_v4();
        self.root.join(".tmp").join(format!("tmp-{}", id))
    }

    /// Read back the bytes stored under `key`.
    pub fn read(&self, key: &str) -> anyhow::Result<Bytes> {
        let path = self.resolve(key)?;
        Ok(Bytes::from(std::fs::read(path)?))
    }

    fn write_atomic(&self, final_path: &Path, data: &[u8]) -> std::io::Result<()> {
        // Ensure parent directory exists (handles keys with '/' separators).
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.temp_path();
        if let Some(parent) = tmp_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?; // fsync

        // Atomic rename to final path.
        if let Err(err) = std::fs::rename(&tmp_path, final_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err);
        }
        Ok(())
    }
}

impl ObjectStore for LocalBackend {
    fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let final_path = self.resolve(&key)?;
            debug!("local put: key={} path={}", key, final_path.display());

            self.write_atomic(&final_path, &data)
                .map_err(|e| StoreError::Unavailable(e.into()))?;

            Ok(self.locator(&key))
        })
    }

    fn locator(&self, key: &str) -> String {
        join_locator(&self.public_base_url, key)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().join("objects"), "http://localhost:3000/media")
            .unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn test_put_writes_file_and_returns_locator() {
        let (_dir, backend) = backend();
        let locator = backend
            .put("cat.png", Bytes::from_static(b"0123456789"), "image/png")
            .await
            .unwrap();
        assert_eq!(locator, "http://localhost:3000/media/cat.png");
        assert_eq!(backend.read("cat.png").unwrap(), Bytes::from_static(b"0123456789"));
    }

    #[tokio::test]
    async fn test_put_nested_key() {
        let (_dir, backend) = backend();
        backend
            .put("camera/2026/shot.webm", Bytes::from_static(b"webm"), "video/webm")
            .await
            .unwrap();
        assert!(backend.root().join("camera/2026/shot.webm").exists());
    }

    #[tokio::test]
    async fn test_put_leaves_no_temp_files() {
        let (_dir, backend) = backend();
        backend
            .put("a.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        let leftovers = std::fs::read_dir(backend.root().join(".tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let (_dir, backend) = backend();
        let err = backend
            .put("../escape.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        let err = backend
            .put("/etc/passwd", Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_temp_dir_key_is_rejected() {
        let (_dir, backend) = backend();
        let err = backend
            .put(".tmp/x", Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }
}
