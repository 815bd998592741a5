//! Object storage backends.
//!
//! The [`backend::ObjectStore`] trait abstracts over where uploaded bytes
//! physically live.  Implementations include AWS S3, local disk, and an
//! in-memory map.

pub mod aws;
pub mod backend;
pub mod local;
pub mod memory;

use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;
use backend::ObjectStore;

/// Build the backend selected by `storage.backend`.
pub async fn build_object_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend.as_str() {
        "aws" => {
            let aws_config = config.aws.as_ref().ok_or_else(|| {
                anyhow::anyhow!("storage.backend is 'aws' but storage.aws config section is missing")
            })?;
            Arc::new(aws::AwsBackend::new(aws_config).await?)
        }
        "memory" => {
            info!(
                "Memory storage backend initialized (locators under {})",
                config.memory.public_base_url
            );
            Arc::new(memory::MemoryBackend::new(config.memory.public_base_url.clone()))
        }
        "local" => {
            let backend = local::LocalBackend::new(
                &config.local.root_dir,
                config.local.public_base_url.clone(),
            )?;
            info!(
                "Local storage backend initialized at {}",
                config.local.root_dir
            );
            Arc::new(backend)
        }
        other => anyhow::bail!("unknown storage backend '{other}' (expected local, memory, or aws)"),
    };
    Ok(store)
}
