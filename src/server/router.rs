use std::net::SocketAddr;

use admission_interceptors::prelude::handle_with_pipeline;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics;

mod admin;

use super::state::ServeState;

/// Admin surface plus the pipeline as fallback for every other path.
pub fn build_router(state: ServeState) -> Router {
    let mut router = Router::new().route("/metrics", get(metrics_handler));
    if state.context.config().server.admin_enabled {
        router = router.merge(admin::router().layer(cors_layer()));
    }
    router
        .fallback(pipeline_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

async fn pipeline_handler(
    State(state): State<ServeState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    req: Request<Body>,
) -> Response {
    let remote = remote.map(|ConnectInfo(addr)| addr);
    handle_with_pipeline(req, remote, &state.pipeline).await
}

async fn metrics_handler(State(state): State<ServeState>) -> Response {
    metrics::register_metrics();
    state.context.publish_cache_metrics();
    metrics::render(metrics::global_registry())
}
