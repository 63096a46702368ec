//! laojobs-cache: inspect and maintain the offline partition store.
//!
//! Reads the same configuration as `laojobs-sw`, so it operates on the
//! database and partition names the proxy uses.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use laojobs_client::{FetchClient, FetchConfig, LocalHost, OfflineCacheManager};
use laojobs_core::CacheDb;
use laojobs_core::config::AppConfig;

mod commands;

/// Offline cache maintenance for the laojobs worker.
#[derive(Parser, Debug)]
#[command(name = "laojobs-cache")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Override the cache database path
    #[arg(long, global = true, env = "LAOJOBS_SW_DB_PATH")]
    db: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the manifest into the static partition
    Install,

    /// Delete partitions that do not belong to the configured version
    Activate,

    /// List partitions with entry counts
    Partitions,

    /// List the entries of one partition
    Entries {
        /// Partition name
        partition: String,
    },

    /// Look a URL up across all partitions
    Match {
        /// Absolute URL, or a path on the configured origin
        url: String,

        /// Print the stored body
        #[arg(long)]
        body: bool,
    },

    /// Delete a partition and all its entries
    Delete {
        /// Partition name
        partition: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut config = AppConfig::load().context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let cache = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::Install => commands::install(&manager(&config, cache)?, &mut out).await,
        Command::Activate => commands::activate(&manager(&config, cache)?, cli.json, &mut out).await,
        Command::Partitions => commands::partitions(&cache, cli.json, &mut out).await,
        Command::Entries { partition } => commands::entries(&cache, &partition, cli.json, &mut out).await,
        Command::Match { url, body } => {
            let origin = config.origin_url()?;
            commands::match_url(&cache, &origin, &url, body, &mut out).await
        }
        Command::Delete { partition } => commands::delete(&cache, &partition, &mut out).await,
    }
}

fn manager(config: &AppConfig, cache: CacheDb) -> Result<OfflineCacheManager> {
    let client = FetchClient::new(FetchConfig::from_app_config(config))?;
    Ok(OfflineCacheManager::new(config.cache_settings()?, cache, Arc::new(client), Arc::new(LocalHost::new())))
}
