//! AWS S3 storage backend.
//!
//! Uploads go straight into a single S3 bucket under the object key.
//! Credentials are resolved via the standard AWS credential chain
//! (env vars, `~/.aws/credentials`, IAM role, etc.) unless explicit keys
//! are configured.
//!
//! Locators are derived from configuration only:
//!   virtual-hosted:  `https://{bucket}.s3.{region}.amazonaws.com/{key}`
//!   custom endpoint: `{endpoint_url}/{bucket}/{key}`
//!   override:        `{public_base_url}/{key}`

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::Client;
use base64::Engine;
use bytes::Bytes;
use md5::{Digest, Md5};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use super::backend::{join_locator, ObjectStore, StoreError};
use crate::config::AwsStorageConfig;

/// Object store backed by an AWS S3 bucket.
pub struct AwsBackend {
    /// AWS S3 SDK client.
    client: Client,
    /// Target bucket name.
    bucket: String,
    /// Locator prefix, computed once at construction.
    base_url: String,
}

impl AwsBackend {
    /// Create a new S3 backend from configuration.
    pub async fn new(config: &AwsStorageConfig) -> anyhow::Result<Self> {
        if config.bucket.trim().is_empty() {
            anyhow::bail!("storage.aws.bucket must not be empty");
        }

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if !config.endpoint_url.is_empty() {
            config_loader = config_loader.endpoint_url(&config.endpoint_url);
        }

        // If explicit credentials are provided, inject them as static credentials.
        if !config.access_key_id.is_empty() && !config.secret_access_key.is_empty() {
            let creds = aws_sdk_s3::config::Credentials::new(
                &config.access_key_id,
                &config.secret_access_key,
                None, // session_token
                None, // expiry
                "snapstore-config",
            );
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;

        let s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.use_path_style);

        let client = Client::from_conf(s3_config_builder.build());
        let base_url = base_url(config);

        info!(
            "S3 backend initialized: bucket={} region={} locator_base={}",
            config.bucket, config.region, base_url
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            base_url,
        })
    }

    /// Base64 of the MD5 digest, as expected by the `Content-MD5` header.
    fn content_md5(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
    }
}

/// Compute the locator prefix for a bucket.
pub fn base_url(config: &AwsStorageConfig) -> String {
    if !config.public_base_url.is_empty() {
        return config.public_base_url.trim_end_matches('/').to_string();
    }
    if !config.endpoint_url.is_empty() {
        return format!(
            "{}/{}",
            config.endpoint_url.trim_end_matches('/'),
            config.bucket
        );
    }
    format!(
        "https://{}.s3.{}.amazonaws.com",
        config.bucket, config.region
    )
}

/// Sort an SDK failure into the two store error kinds.
///
/// Only an actual answer from S3 counts as a rejection; everything that
/// failed before or while talking to S3 means the store was unavailable.
fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let rejected = matches!(err, SdkError::ServiceError(_));
    let err = anyhow::anyhow!("S3 put_object: {}", DisplayErrorContext(err));
    if rejected {
        StoreError::Rejected(err)
    } else {
        StoreError::Unavailable(err)
    }
}

impl ObjectStore for AwsBackend {
    fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + '_>> {
        let key = key.to_string();
        let content_type = content_type.to_string();
        Box::pin(async move {
            let content_md5 = Self::content_md5(&data);

            debug!(
                "S3 put_object: bucket={} key={} size={}",
                self.bucket,
                key,
                data.len()
            );

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_type(content_type)
                .content_md5(content_md5)
                .body(aws_sdk_s3::primitives::ByteStream::from(data))
                .send()
                .await
                .map_err(classify_sdk_error)?;

            Ok(self.locator(&key))
        })
    }

    fn locator(&self, key: &str) -> String {
        join_locator(&self.base_url, key)
    }

    fn name(&self) -> &'static str {
        "aws"
    }
}
