//! Command line and configuration loading
//!
//! Settings are layered, later sources winning:
//! 1. built-in defaults
//! 2. the YAML file (`conf/locksmith.yml` unless `--config` says otherwise, optional)
//! 3. `LOCKSMITH_`-prefixed environment variables, `__` separating sections
//!    (e.g. `LOCKSMITH_REDIS__HOST`, `LOCKSMITH_LOCKSMITH__MAX_RETRIES`)
//! 4. command line flags

use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use locksmith_core::LocksmithConfig;
use locksmith_redis::RedisStoreConfig;
use serde::Deserialize;

use crate::logging::LogConfig;

pub const DEFAULT_CONFIG_FILE: &str = "conf/locksmith.yml";

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "locksmith", version, about = "Lease-based distributed locks over Redis")]
pub struct Cli {
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
    #[arg(long = "host")]
    pub host: Option<String>,
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    #[arg(long = "password", env = "REDIS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[arg(long = "db")]
    pub database: Option<u32>,
    #[arg(long = "prefix")]
    pub prefix: Option<String>,
    /// Lease length in seconds
    #[arg(short = 't', long = "timeout", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
    #[arg(short = 'r', long = "retries")]
    pub retries: Option<u32>,
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
    /// Use an in-process store instead of Redis
    #[arg(long = "memory")]
    pub memory: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Acquire a lock, hold it, then release it
    Hold {
        key: String,
        /// Seconds to hold before releasing
        #[arg(long = "for", default_value_t = 0)]
        hold_for: u64,
    },
    /// Run the holder / waiter / unrelated-key walkthrough
    Demo,
}

/// Fully resolved application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub locksmith: LocksmithConfig,
    #[serde(default)]
    pub redis: RedisStoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name(&cli.config_file).required(false))
            .add_source(
                Environment::with_prefix("LOCKSMITH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(v) = &cli.host {
            builder = builder.set_override("redis.host", v.as_str())?;
        }
        if let Some(v) = cli.port {
            builder = builder.set_override("redis.port", i64::from(v))?;
        }
        if let Some(v) = &cli.password {
            builder = builder.set_override("redis.password", v.as_str())?;
        }
        if let Some(v) = cli.database {
            builder = builder.set_override("redis.database", i64::from(v))?;
        }
        if let Some(v) = &cli.prefix {
            builder = builder.set_override("locksmith.key_prefix", v.as_str())?;
        }
        if let Some(v) = cli.timeout {
            builder = builder.set_override("locksmith.lease_timeout_seconds", i64::try_from(v)?)?;
        }
        if let Some(v) = cli.retries {
            builder = builder.set_override("locksmith.max_retries", i64::from(v))?;
        }
        if let Some(v) = &cli.log_level {
            builder = builder.set_override("log.level", v.as_str())?;
        }

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
