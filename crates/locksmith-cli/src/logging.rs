//! Console logging setup.
//!
//! `RUST_LOG` wins over the configured level when set.

use serde::Deserialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, e.g. `info` or `locksmith_core=debug`
    #[serde(default = "default_level")]
    pub level: String,
    /// Include source file and line in each event
    #[serde(default = "default_with_location")]
    pub with_location: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_with_location() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            with_location: default_with_location(),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(config.with_location)
        .with_line_number(config.with_location)
        .with_filter(filter);

    Registry::default()
        .with(console_layer)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    tracing::debug!(level = %config.level, "Logging initialized");
    Ok(())
}
