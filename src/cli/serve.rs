use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use admission_interceptors::prelude::DryRunDispatcher;
use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio::time::interval;
use tracing::{info, warn};

use super::context::CliContext;
use crate::metrics;
use crate::server::{build_router, ServeState};

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listener address (host:port); overrides server.listen
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Accept traffic before rules and mappings have been loaded
    #[arg(long)]
    pub no_warm_up: bool,

    /// Seconds between cache metric updates
    #[arg(long, default_value_t = 15)]
    pub metrics_interval_secs: u64,
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    metrics::register_metrics();
    let context = ctx.app_context().await?.clone();
    let pipeline = context.pipeline(Arc::new(DryRunDispatcher))?;
    let state = ServeState::new(context.clone(), pipeline);
    state.health.mark_live();

    if args.no_warm_up {
        state.health.mark_ready();
    } else {
        let failures = context.warm_up().await;
        if failures.is_empty() {
            state.health.mark_ready();
        } else {
            state.health.mark_unready(failures.join("; "));
        }
    }

    let period = Duration::from_secs(args.metrics_interval_secs.max(1));
    let metrics_context = context.clone();
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            metrics_context.publish_cache_metrics();
        }
    });

    let addr = args.listen.unwrap_or(ctx.config().server.listen);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        fail_policy = %context.access().fail_policy(),
        config = %ctx.config_path().display(),
        "admission gateway listening"
    );

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("gateway server exited with error")?;
    info!("admission gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
