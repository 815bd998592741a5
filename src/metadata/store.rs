//! Abstract metadata store trait.
//!
//! Any metadata backend must implement [`MetadataStore`].  The trait
//! uses `async_trait`-style methods (manual desugaring with pinned
//! futures) so it can be used with both SQLite and future remote stores.

use std::future::Future;
use std::pin::Pin;

// ── Record types ───────────────────────────────────────────────────

/// One committed upload, as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    /// Store-assigned, monotonically increasing id.
    pub id: i64,
    /// Original or generated filename.
    pub filename: String,
    /// Public URL of the stored bytes.
    pub locator: String,
    /// ISO-8601 commit timestamp.
    pub created_at: String,
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUploadRecord {
    /// Original or generated filename.
    pub filename: String,
    /// Public URL of the stored bytes.
    pub locator: String,
    /// ISO-8601 commit timestamp.
    pub created_at: String,
}

/// Async metadata store contract.
///
/// The store is append-only: there is no update or delete.
pub trait MetadataStore: Send + Sync + 'static {
    /// Append a record, returning its assigned id.
    fn insert(
        &self,
        record: NewUploadRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<i64>> + Send + '_>>;

    /// Every record, newest (highest id) first.
    fn list_all(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<UploadRecord>>> + Send + '_>>;

    /// Number of records.
    fn count(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<u64>> + Send + '_>>;

    /// Cheap round trip used by readiness probes.
    fn ping(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}
