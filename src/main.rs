use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;

use retell_sync::api;
use retell_sync::config::Config;
use retell_sync::feed::FetchLimits;
use retell_sync::storage::{Database, DatabaseError};
use retell_sync::sync::{ImageStore, Syncer};

#[derive(Parser, Debug)]
#[command(
    name = "retell-sync",
    about = "Podcast RSS ingestion and reconciliation service for Retell"
)]
struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "FILE", default_value = "retell-sync.toml")]
    config: PathBuf,

    /// Run a platform-wide sync of all approved podcasts and exit
    /// instead of serving the API
    #[arg(long)]
    sync_all: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config).context("Failed to load configuration")?;

    let db = match Database::open(&config.database_path).await {
        Ok(db) => db,
        Err(DatabaseError::Locked) => {
            eprintln!("Error: the database is locked by another process. Close it and try again.");
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let client = reqwest::Client::builder()
        .user_agent(concat!("retell-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let images = Arc::new(
        ImageStore::new(&config.media_dir, &config.public_base_url)
            .context("Failed to create media directory")?,
    );

    let limits = FetchLimits {
        timeout: Duration::from_secs(config.fetch_timeout_secs),
        max_feed_bytes: config.max_feed_bytes,
        max_image_bytes: config.max_image_bytes,
        allow_private_hosts: config.allow_private_hosts,
    };

    let syncer = Syncer::new(db, client, images, limits);

    // One-shot mode for cron-style scheduling
    if args.sync_all {
        let summary = syncer
            .sync_all_approved()
            .await
            .map_err(|e| anyhow::anyhow!("Platform sync failed: {}", e))?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    // Env var takes precedence over the config file
    let service_token = std::env::var("RETELL_SERVICE_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .or(config.service_token.clone())
        .map(|t| Arc::new(SecretString::from(t)));

    if service_token.is_none() {
        tracing::warn!("No service token configured, platform sync endpoint is disabled");
    }

    let ctx = api::AppContext {
        syncer,
        service_token,
    };

    api::run(&config, ctx).await
}
