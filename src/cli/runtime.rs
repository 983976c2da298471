use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{self, GatewayConfig};

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: GatewayConfig,
    pub path: PathBuf,
}

pub fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let path = match config_path {
        Some(path) => path.clone(),
        None => config::default_config_path(),
    };

    if path.exists() {
        info!("Loading configuration from: {}", path.display());
    } else {
        warn!(
            "Config file not found, using defaults and environment: {}",
            path.display()
        );
    }
    let config = config::load_config(Some(&path))
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    Ok(LoadedConfig { config, path })
}
