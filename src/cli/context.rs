use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::OnceCell;

use crate::app_context::AppContext;
use crate::config::GatewayConfig;

pub struct CliContext {
    config: GatewayConfig,
    config_path: PathBuf,
    metrics_port: u16,
    app_context: OnceCell<AppContext>,
}

impl CliContext {
    pub fn new(config: GatewayConfig, config_path: PathBuf, metrics_port: u16) -> Self {
        Self {
            config,
            config_path,
            metrics_port,
            app_context: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn metrics_port(&self) -> u16 {
        self.metrics_port
    }

    /// Opens the store and caches on first use.
    pub async fn app_context(&self) -> Result<&AppContext> {
        self.app_context
            .get_or_try_init(|| AppContext::build(self.config.clone()))
            .await
    }
}
