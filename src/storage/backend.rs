//! Abstract object store trait.
//!
//! Every storage backend must implement [`ObjectStore`].  A backend turns a
//! logical `(key, bytes)` pair into exactly one write against the medium and
//! reports the public locator for that key.

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Characters left untouched inside a single key segment of a locator.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Failure modes of an object-store write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached, or the write did not finish in time.
    #[error("object store unavailable: {0:#}")]
    Unavailable(anyhow::Error),

    /// The store answered, but refused the write.
    #[error("object store rejected the write: {0:#}")]
    Rejected(anyhow::Error),
}

/// Async object storage contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// Write `data` under `key` and return the locator of the stored bytes.
    ///
    /// The returned locator is always equal to [`ObjectStore::locator`] for
    /// the same key.
    fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + '_>>;

    /// Public address of `key`.  Pure; no round trip to the store.
    fn locator(&self, key: &str) -> String;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Join `base` and a percent-encoded `key`, preserving `/` separators.
pub fn join_locator(base: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), encoded.join("/"))
}
