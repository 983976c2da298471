use std::{net::SocketAddr, sync::Arc};

use admission_cache::StatsSnapshot;
use admission_interceptors::metrics as pipeline_metrics;
use axum::{
    extract::State,
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use lazy_static::lazy_static;
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{opts, Encoder, IntGaugeVec, Registry, TextEncoder};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info};

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();

lazy_static! {
    static ref CACHE_STATS: IntGaugeVec = IntGaugeVec::new(
        opts!("gateway_cache_stats", "Snapshot cache counters by cache and field"),
        &["cache", "field"]
    )
    .unwrap();
}

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        pipeline_metrics::register_metrics(registry);
        if let Err(err) = registry.register(Box::new(CACHE_STATS.clone())) {
            if !matches!(err, prometheus::Error::AlreadyReg) {
                error!(?err, "failed to register cache metrics");
            }
        }
    });
}

/// Copies a cache's counters into the exported gauges.
pub fn observe_cache(cache: &str, stats: &StatsSnapshot) {
    let fields = [
        ("hits", stats.hits),
        ("misses", stats.misses),
        ("loads", stats.loads),
        ("errors", stats.errors),
        ("last_load_ms", stats.last_load_ms),
    ];
    for (field, value) in fields {
        CACHE_STATS
            .with_label_values(&[cache, field])
            .set(i64::try_from(value).unwrap_or(i64::MAX));
    }
}

pub fn spawn_metrics_server(port: u16) -> Option<JoinHandle<()>> {
    if port == 0 {
        return None;
    }

    register_metrics();
    let registry = Arc::new(global_registry().clone());
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(%addr, "metrics server listening");
    Some(tokio::spawn(async move {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                    error!(?err, "metrics server exited with error");
                }
            }
            Err(err) => {
                error!(?err, "failed to bind metrics listener");
            }
        }
    }))
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    render(&registry)
}

/// Encodes `registry` in the Prometheus text format.
pub fn render(registry: &Registry) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        error!(?err, "failed to encode prometheus metrics");
        return encode_error();
    }

    match String::from_utf8(buffer) {
        Ok(body) => match HeaderValue::from_str(encoder.format_type()) {
            Ok(value) => ([(axum::http::header::CONTENT_TYPE, value)], body).into_response(),
            Err(err) => {
                error!(?err, "failed to build content-type header");
                encode_error()
            }
        },
        Err(err) => {
            error!(?err, "failed to convert prometheus metrics to utf8");
            encode_error()
        }
    }
}

fn encode_error() -> Response {
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        "metric encode error",
    )
        .into_response()
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}
