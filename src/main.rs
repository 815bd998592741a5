//! SnapStore -- media upload and gallery index server.
//!
//! Every startup opens (or creates) the SQLite index and the configured
//! object store. SIGTERM/SIGINT stop accepting connections and drain
//! in-flight requests for at most `server.shutdown_timeout` seconds.

use std::future::IntoFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Notify;
use tracing::{info, warn};

use snapstore::config::{Config, LoggingConfig};

/// Config file read when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "snapstore.yaml";

/// Command-line arguments for the SnapStore server.
#[derive(Parser, Debug)]
#[command(
    name = "snapstore",
    version,
    about = "Media upload and gallery index server"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, source) = resolve_config(cli.config.as_deref())?;
    config.apply_env_overrides();

    init_tracing(&config.logging);
    info!("Configuration loaded from {source}");

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    if config.observability.metrics {
        snapstore::metrics::init_metrics()?;
        snapstore::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    // Initialize metadata store (SQLite).
    let metadata_path = &config.metadata.sqlite.path;
    if let Some(parent) = Path::new(metadata_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let metadata_store = snapstore::metadata::sqlite::SqliteMetadataStore::new(metadata_path)?;
    info!("SQLite metadata store initialized at {}", metadata_path);
    let metadata: Arc<dyn snapstore::metadata::store::MetadataStore> = Arc::new(metadata_store);

    let storage = snapstore::storage::build_object_store(&config.storage).await?;

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let state = Arc::new(snapstore::AppState::new(config, storage, metadata));
    let app = snapstore::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("SnapStore listening on {}", bind_addr);

    let signalled = Arc::new(Notify::new());
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(signalled.clone()))
        .into_future();

    tokio::select! {
        result = serve => result?,
        _ = async {
            signalled.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                "In-flight requests still running after {}s, exiting",
                shutdown_timeout.as_secs()
            );
        }
    }

    info!("SnapStore shut down");

    Ok(())
}

/// Load the explicit config file, or the default one when present.
///
/// A missing default file falls back to built-in defaults; a missing
/// explicit file is an error.
fn resolve_config(explicit: Option<&str>) -> anyhow::Result<(Config, String)> {
    match explicit {
        Some(path) => Ok((snapstore::config::load_config(path)?, path.to_string())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Ok((
            snapstore::config::load_config(DEFAULT_CONFIG_PATH)?,
            DEFAULT_CONFIG_PATH.to_string(),
        )),
        None => Ok((Config::default(), "built-in defaults".to_string())),
    }
}

/// `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal(signalled: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }

    signalled.notify_one();
}
