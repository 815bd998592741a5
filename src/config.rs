//! Configuration loading and types for SnapStore.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Each subsection governs a different part of the
//! system: networking, metadata persistence, object storage, ingestion
//! limits, logging, and observability.  A handful of environment
//! variables (see [`Config::apply_env_overrides`]) take precedence over
//! the file.

use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the S3 bucket uploads are written to.
pub const ENV_BUCKET: &str = "S3_BUCKET_NAME";
/// Environment variable naming the S3 region of that bucket.
pub const ENV_REGION: &str = "S3_REGION";
/// Environment variable overriding the SQLite index path.
pub const ENV_DB_PATH: &str = "SNAPSTORE_DB_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Metadata index settings.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Object storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upload limits and deadlines.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings (metrics + health probes).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Ingestion limits.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Largest accepted file payload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Deadline for a single object-store write, in seconds.
    #[serde(default = "default_storage_timeout")]
    pub storage_timeout_secs: u64,

    /// Deadline for a single metadata insert or listing query, in seconds.
    /// Lock waits inside SQLite are bounded separately by `busy_timeout`.
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            storage_timeout_secs: default_storage_timeout(),
            metadata_timeout_secs: default_metadata_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
///
/// Controls Prometheus metrics collection and the health probes.
/// Both are enabled by default.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,

    /// Enable `/health` and `/readyz` probes.
    #[serde(default = "default_true")]
    pub health_check: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics: true,
            health_check: true,
        }
    }
}

/// Metadata index configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetadataConfig {
    /// SQLite-specific configuration.
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

/// SQLite-specific metadata configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_metadata_path")]
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_metadata_path(),
        }
    }
}

/// Object storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend type: `local`, `memory`, `aws`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Local storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,

    /// Memory storage configuration.
    #[serde(default)]
    pub memory: MemoryStorageConfig,

    /// AWS S3 configuration.
    #[serde(default)]
    pub aws: Option<AwsStorageConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            local: LocalStorageConfig::default(),
            memory: MemoryStorageConfig::default(),
            aws: None,
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    /// Root directory for stored objects.
    #[serde(default = "default_storage_root")]
    pub root_dir: String,

    /// URL prefix under which the root directory is published.
    #[serde(default = "default_local_base_url")]
    pub public_base_url: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_storage_root(),
            public_base_url: default_local_base_url(),
        }
    }
}

/// Memory storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryStorageConfig {
    /// URL prefix used when building locators.
    #[serde(default = "default_memory_base_url")]
    pub public_base_url: String,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        Self {
            public_base_url: default_memory_base_url(),
        }
    }
}

/// AWS S3 configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsStorageConfig {
    /// Target S3 bucket name.
    pub bucket: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: String,
    /// Force path-style URL addressing.
    #[serde(default)]
    pub use_path_style: bool,
    /// Overrides the computed locator prefix (e.g. a CDN in front of the bucket).
    #[serde(default)]
    pub public_base_url: String,
    /// Explicit AWS access key (falls back to env/credential chain).
    #[serde(default)]
    pub access_key_id: String,
    /// Explicit AWS secret key (falls back to env/credential chain).
    #[serde(default)]
    pub secret_access_key: String,
}

impl AwsStorageConfig {
    fn for_bucket(bucket: String) -> Self {
        Self {
            bucket,
            region: default_region(),
            endpoint_url: String::new(),
            use_path_style: false,
            public_base_url: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }
}

impl Config {
    /// Apply `S3_BUCKET_NAME`, `S3_REGION`, and `SNAPSTORE_DB_PATH`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Setting the bucket switches the storage backend to `aws`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(bucket) = non_empty(ENV_BUCKET) {
            match self.storage.aws.as_mut() {
                Some(aws) => aws.bucket = bucket,
                None => self.storage.aws = Some(AwsStorageConfig::for_bucket(bucket)),
            }
            self.storage.backend = "aws".to_string();
        }
        if let Some(region) = non_empty(ENV_REGION) {
            if let Some(aws) = self.storage.aws.as_mut() {
                aws.region = region;
            }
        }
        if let Some(path) = non_empty(ENV_DB_PATH) {
            self.metadata.sqlite.path = path;
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_metadata_path() -> String {
    "./data/images.db".to_string()
}

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_storage_root() -> String {
    "./data/objects".to_string()
}

fn default_local_base_url() -> String {
    "http://localhost:3000/media".to_string()
}

fn default_memory_base_url() -> String {
    "memory://snapstore".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_upload_bytes() -> u64 {
    52_428_800 // 50 MiB
}

fn default_storage_timeout() -> u64 {
    30
}

fn default_metadata_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    parse_config(&contents)
}

/// Parse configuration from YAML text.  An empty document yields defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, "local");
        assert_eq!(config.metadata.sqlite.path, "./data/images.db");
        assert_eq!(config.ingest.max_upload_bytes, 52_428_800);
        assert!(config.observability.metrics);
    }

    #[test]
    fn test_parse_aws_section() {
        let yaml = r#"
server:
  port: 8080
storage:
  backend: aws
  aws:
    bucket: gallery-media
    region: eu-west-1
ingest:
  storage_timeout_secs: 10
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        let aws = config.storage.aws.unwrap();
        assert_eq!(aws.bucket, "gallery-media");
        assert_eq!(aws.region, "eu-west-1");
        assert!(!aws.use_path_style);
        assert_eq!(config.ingest.storage_timeout_secs, 10);
        assert_eq!(config.ingest.metadata_timeout_secs, 5);
    }

    #[test]
    fn test_env_bucket_switches_backend_to_aws() {
        let vars: HashMap<&str, &str> = [
            (ENV_BUCKET, "camera-uploads"),
            (ENV_REGION, "ap-south-1"),
            (ENV_DB_PATH, "/var/lib/snapstore/images.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.storage.backend, "aws");
        let aws = config.storage.aws.unwrap();
        assert_eq!(aws.bucket, "camera-uploads");
        assert_eq!(aws.region, "ap-south-1");
        assert_eq!(config.metadata.sqlite.path, "/var/lib/snapstore/images.db");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|name| match name {
            ENV_BUCKET => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.storage.backend, "local");
        assert!(config.storage.aws.is_none());
    }

    #[test]
    fn test_region_override_keeps_file_bucket() {
        let yaml = "storage:\n  backend: aws\n  aws:\n    bucket: from-file\n";
        let mut config = parse_config(yaml).unwrap();
        config.apply_overrides(|name| (name == ENV_REGION).then(|| "us-west-2".to_string()));
        let aws = config.storage.aws.unwrap();
        assert_eq!(aws.bucket, "from-file");
        assert_eq!(aws.region, "us-west-2");
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapstore.yaml");
        std::fs::write(&path, "logging:\n  format: json\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(include_str!("../snapstore.example.yaml")).unwrap();
        assert_eq!(config.storage.backend, "local");
        assert!(config.storage.aws.is_none());
        assert_eq!(config.ingest.metadata_timeout_secs, 5);
    }
}
