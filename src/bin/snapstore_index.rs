//! CLI entry point for snapstore-index: offline inspection of the gallery index.

use clap::{Parser, Subcommand};
use snapstore::handlers::list::{ImageEntry, ListResponse};
use snapstore::metadata::sqlite::SqliteMetadataStore;
use snapstore::metadata::store::MetadataStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snapstore-index", about = "SnapStore gallery index inspection tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record as JSON, newest first
    List {
        #[arg(long, default_value = "snapstore.yaml")]
        config: PathBuf,
        #[arg(long)]
        db: Option<String>,
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the number of records
    Count {
        #[arg(long, default_value = "snapstore.yaml")]
        config: PathBuf,
        #[arg(long)]
        db: Option<String>,
    },
}

/// `--db` wins; otherwise the config file (or defaults when it is absent),
/// with `SNAPSTORE_DB_PATH` applied on top.
fn resolve_db_path(config_path: &PathBuf, db: Option<String>) -> anyhow::Result<String> {
    if let Some(path) = db {
        return Ok(path);
    }
    let mut config = if config_path.exists() {
        snapstore::config::load_config(config_path)?
    } else {
        snapstore::config::Config::default()
    };
    config.apply_env_overrides();
    Ok(config.metadata.sqlite.path)
}

fn open_store(config: &PathBuf, db: Option<String>) -> anyhow::Result<SqliteMetadataStore> {
    let db_path = resolve_db_path(config, db)?;
    if !std::path::Path::new(&db_path).exists() {
        anyhow::bail!("index database not found: {}", db_path);
    }
    SqliteMetadataStore::new(&db_path)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let rc = match cli.command {
        Commands::List { config, db, pretty } => run_list(config, db, pretty).await,
        Commands::Count { config, db } => run_count(config, db).await,
    };
    std::process::exit(rc);
}

async fn run_list(config: PathBuf, db: Option<String>, pretty: bool) -> i32 {
    let store = match open_store(&config, db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening index: {:#}", e);
            return 1;
        }
    };

    let records = match store.list_all().await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error listing records: {:#}", e);
            return 1;
        }
    };

    let response = ListResponse {
        images: records.into_iter().map(ImageEntry::from).collect(),
    };
    let rendered = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    match rendered {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error encoding JSON: {}", e);
            1
        }
    }
}

async fn run_count(config: PathBuf, db: Option<String>) -> i32 {
    let store = match open_store(&config, db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening index: {:#}", e);
            return 1;
        }
    };

    match store.count().await {
        Ok(count) => {
            println!("{}", count);
            0
        }
        Err(e) => {
            eprintln!("Error counting records: {:#}", e);
            1
        }
    }
}
