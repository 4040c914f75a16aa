//! Cache node
//!
//! Runs one cache-manager instance against the configured Remote Tier:
//! joins the invalidation bus, sweeps its Local Tier and reports metrics
//! until interrupted.

#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tiered_cache::{Config, TieredCache, storage, utils};
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "cache-node")]
#[command(about = "Multi-tier distributed cache node")]
#[command(version)]
struct CliArgs {
    /// Configuration file; environment variables override its values
    #[arg(long, short = 'c', env = "TIERED_CACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let config = load_config(args.config.as_deref()).await?;

    if args.check {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    utils::logging::init(&config.logging)?;
    let build = tiered_cache::build_info();
    info!(version = build.version, git = build.git_hash, "Starting cache node");

    let store = storage::connect(&config.redis)
        .await
        .context("Failed to connect to the Remote Tier")?;
    let cache = TieredCache::new(config.cache, store)
        .await
        .context("Failed to start cache manager")?;

    info!(instance = %cache.instance_id(), "Cache node running, press Ctrl+C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    cache.shutdown().await;
    #[cfg(feature = "metrics")]
    {
        let exporter = tiered_cache::PrometheusExporter::new()?;
        info!("Final metrics:\n{}", cache.render_prometheus(&exporter)?);
    }
    let metrics = cache.metrics();
    info!(
        hits = metrics.hits,
        misses = metrics.misses,
        hit_rate = metrics.hit_rate,
        "Cache node stopped"
    );
    Ok(())
}

/// File values first, then environment overrides
async fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let env = Config::from_env().context("Invalid environment configuration")?;
    let config = match path {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?
            .merge(env),
        None => env,
    };
    config.validate()?;
    Ok(config)
}
