//! Locksmith command line driver

mod commands;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use locksmith_core::{LeaseStore, Locksmith, MemoryLeaseStore};
use locksmith_redis::RedisStore;
use tracing::info;

use crate::config::{AppConfig, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli)
        .with_context(|| format!("failed to load configuration from {}", cli.config_file))?;

    logging::init_logging(&config.log).map_err(|e| anyhow::anyhow!("{}", e))?;
    locksmith_core::metrics::describe_metrics();

    let store = build_store(&cli, &config).await?;

    match cli.command {
        Command::Hold { key, hold_for } => {
            let locksmith = Locksmith::new(store, config.locksmith);
            commands::hold(&locksmith, &key, hold_for).await?;
        }
        Command::Demo => {
            let locksmith = Locksmith::new(
                store,
                config
                    .locksmith
                    .with_lease_timeout(commands::DEMO_LEASE_SECONDS),
            );
            let report = commands::demo(&locksmith).await?;
            info!(order = ?report.acquired, first_release = %report.first_release, "demo finished");
        }
    }

    Ok(())
}

async fn build_store(cli: &Cli, config: &AppConfig) -> anyhow::Result<Arc<dyn LeaseStore>> {
    if cli.memory {
        info!("Using in-process lease store");
        return Ok(Arc::new(MemoryLeaseStore::new()));
    }

    let store = RedisStore::connect(&config.redis)
        .await
        .with_context(|| format!("failed to connect to Redis at {}", config.redis.addr()))?;
    Ok(Arc::new(store))
}
