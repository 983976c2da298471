use admission_cache::CacheError;
use admission_core_types::RecordId;
use admission_errors::prelude::ErrorObj;
use admission_interceptors::errors::{to_http_response, InterceptError};
use admission_store::{Row, StoreError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::server::ServeState;

pub(crate) fn router() -> Router<ServeState> {
    Router::new()
        .route(
            "/admin/cache/access-rules/refresh",
            post(refresh_access_rules),
        )
        .route("/admin/cache/access-rules", delete(clear_access_rules))
        .route(
            "/admin/cache/url-mappings/refresh",
            post(refresh_url_mappings),
        )
        .route("/admin/cache/url-mappings", delete(clear_url_mappings))
        .route("/admin/cache", get(cache_status))
        .route(
            "/admin/config/access-rules",
            get(access_rules).post(save_access_rule),
        )
        .route("/admin/config/access-rules/:id", delete(delete_access_rule))
        .route(
            "/admin/config/url-mappings",
            get(url_mappings).post(save_url_mapping),
        )
        .route("/admin/config/url-mappings/:id", delete(delete_url_mapping))
        .route("/admin/health", get(health))
        .route("/admin/info", get(build_info))
}

fn count_response(action: &str, outcome: Result<usize, CacheError>) -> Response {
    match outcome {
        Ok(count) => {
            info!(action, count, "admin cache operation");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "action": action,
                    "count": count,
                })),
            )
                .into_response()
        }
        Err(err) => {
            error!(action, %err, "admin cache operation failed");
            error_response(err.into_inner())
        }
    }
}

fn record_response<T: Serialize>(action: &str, outcome: Result<T, StoreError>) -> Response {
    match outcome {
        Ok(record) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "action": action,
                "record": record,
            })),
        )
            .into_response(),
        Err(err) => {
            error!(action, %err, "admin record operation failed");
            error_response(err.into_inner())
        }
    }
}

fn error_response(err: ErrorObj) -> Response {
    let (status, body) = to_http_response(&InterceptError::from_error(err));
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

async fn refresh_access_rules(State(state): State<ServeState>) -> Response {
    count_response(
        "refresh_access_rules",
        state.context.refresh_access_rules().await,
    )
}

async fn clear_access_rules(State(state): State<ServeState>) -> Response {
    count_response("clear_access_rules", state.context.clear_access_rules().await)
}

async fn refresh_url_mappings(State(state): State<ServeState>) -> Response {
    count_response(
        "refresh_url_mappings",
        state.context.refresh_url_mappings().await,
    )
}

async fn clear_url_mappings(State(state): State<ServeState>) -> Response {
    count_response("clear_url_mappings", state.context.clear_url_mappings().await)
}

async fn save_access_rule(State(state): State<ServeState>, Json(row): Json<Row>) -> Response {
    record_response("save_access_rule", state.context.save_access_rule(row).await)
}

async fn delete_access_rule(
    State(state): State<ServeState>,
    Path(id): Path<RecordId>,
) -> Response {
    record_response("delete_access_rule", state.context.delete_access_rule(id).await.map(|()| id))
}

async fn save_url_mapping(State(state): State<ServeState>, Json(row): Json<Row>) -> Response {
    record_response("save_url_mapping", state.context.save_url_mapping(row).await)
}

async fn delete_url_mapping(
    State(state): State<ServeState>,
    Path(id): Path<RecordId>,
) -> Response {
    record_response("delete_url_mapping", state.context.delete_url_mapping(id).await.map(|()| id))
}

async fn cache_status(State(state): State<ServeState>) -> Json<serde_json::Value> {
    Json(json!({ "caches": state.context.cache_status() }))
}

async fn access_rules(State(state): State<ServeState>) -> Json<serde_json::Value> {
    let snapshot = state.context.rules().get().await;
    Json(json!({
        "origin": snapshot.origin,
        "count": snapshot.len(),
        "fail_policy": state.context.access().fail_policy(),
        "rules": snapshot.items.as_ref(),
    }))
}

async fn url_mappings(State(state): State<ServeState>) -> Json<serde_json::Value> {
    let snapshot = state.context.mappings().get().await;
    Json(json!({
        "origin": snapshot.origin,
        "count": snapshot.len(),
        "mappings": snapshot.items.as_ref(),
    }))
}

async fn health(State(state): State<ServeState>) -> Response {
    let snapshot = state.health_snapshot();
    let status = if snapshot.live {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if snapshot.ready { "ok" } else { "degraded" },
            "live": snapshot.live,
            "ready": snapshot.ready,
            "last_ready_check_ts": snapshot.last_ready_check,
            "last_error": snapshot.last_error,
            "caches": state.context.cache_status(),
        })),
    )
        .into_response()
}

async fn build_info(State(state): State<ServeState>) -> Json<serde_json::Value> {
    let context = &state.context;
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "build_date": env!("BUILD_DATE"),
        "git_hash": env!("GIT_HASH"),
        "instance_id": context.instance_id(),
        "started_at": context.started_at().to_rfc3339(),
        "fail_policy": context.access().fail_policy(),
        "stages": state.pipeline.kinds(),
    }))
}
