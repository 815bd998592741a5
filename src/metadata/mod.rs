//! Metadata index layer.
//!
//! The metadata store is the append-only log of committed uploads that
//! the gallery listing is served from.  The [`store::MetadataStore`] trait
//! defines the interface; [`sqlite::SqliteMetadataStore`] is the default
//! implementation.

pub mod sqlite;
pub mod store;
