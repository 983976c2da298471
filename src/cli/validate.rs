use anyhow::Result;

use super::context::CliContext;
use super::output::{print_structured, OutputFormat};
use crate::config::{CacheBackendConfig, StoreConfig};

/// Loading already validated the file; this prints the effective settings.
pub fn cmd_validate(ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let config = ctx.config();
    config.validate()?;
    if print_structured(output, config)? {
        return Ok(());
    }

    println!("Configuration OK: {}", ctx.config_path().display());
    println!("  listen          {}", config.server.listen);
    println!("  fail policy     {}", config.fail_policy()?);
    println!(
        "  access control  {} (bypass: {})",
        on_off(config.access_control.enabled),
        config.access_control.bypass_prefixes.join(", ")
    );
    println!("  url mapping     {}", on_off(config.url_mapping.enabled));
    println!("  monitoring      {}", on_off(config.monitoring.enabled));
    println!(
        "  cache           ttl={}s load_timeout={}ms backend={}",
        config.cache.ttl_secs,
        config.cache.load_timeout_ms,
        match &config.cache.backend {
            CacheBackendConfig::Local => "local".to_string(),
            CacheBackendConfig::Redis { url, .. } => format!("redis ({url})"),
        }
    );
    match &config.store {
        StoreConfig::Memory { seed: Some(seed) } => {
            println!("  store           memory, seeded from {}", seed.display())
        }
        StoreConfig::Memory { seed: None } => println!("  store           memory"),
        StoreConfig::File { path } => println!("  store           file {}", path.display()),
    }
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
