use std::sync::Arc;

use admission_core_types::{AccessRule, MatchPattern, MatchType, RecordId, RuleType, UrlMapping};
use admission_gateway::config::{GatewayConfig, StoreConfig};
use admission_gateway::server::{build_router, ServeState};
use admission_gateway::AppContext;
use admission_interceptors::prelude::DryRunDispatcher;
use admission_policy::FailPolicy;
use admission_store::prelude::*;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

fn config(policy: FailPolicy) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.access_control.fail_policy = Some(policy);
    config
}

fn seeded_context(policy: FailPolicy) -> AppContext {
    let memory = MemoryStore::new();
    memory.seed(&[
        AccessRule::new(1, "block-admin", RuleType::Blacklist, MatchType::Path, MatchPattern::Prefix, "/secret")
            .with_priority(100),
        AccessRule::new(2, "scanners", RuleType::Blacklist, MatchType::Ip, MatchPattern::Cidr, "203.0.113.0/24")
            .with_priority(50),
    ]);
    memory.seed(&[
        UrlMapping::new(1, "legacy", "/old/**", "/new/**", "order-service"),
        UrlMapping::new(2, "users", "/api/v1/users/*", "/users/*", "user-service").with_priority(5),
    ]);
    let rules: InMemoryRepository<AccessRule> = InMemoryRepository::new(&memory);
    let mappings: InMemoryRepository<UrlMapping> = InMemoryRepository::new(&memory);
    AppContext::with_stores(config(policy), Arc::new(rules), Arc::new(mappings), None).unwrap()
}

fn router(context: AppContext) -> Router {
    let pipeline = context.pipeline(Arc::new(DryRunDispatcher)).unwrap();
    let state = ServeState::new(context, pipeline);
    state.health.mark_live();
    state.health.mark_ready();
    build_router(state)
}

async fn send(router: &Router, method: &str, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    call(router, builder.body(Body::empty()).unwrap()).await
}

async fn send_json(router: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    call(router, request).await
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

#[tokio::test]
async fn admin_refresh_and_clear_report_set_sizes() {
    let app = router(seeded_context(FailPolicy::Closed));

    let (status, body) = send(&app, "POST", "/admin/cache/access-rules/refresh", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, "POST", "/admin/cache/url-mappings/refresh", &[]).await;
    assert_eq!(body["count"], 2);

    let (status, body) = send(&app, "DELETE", "/admin/cache/access-rules", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (_, caches) = send(&app, "GET", "/admin/cache", &[]).await;
    assert!(caches["caches"][0]["entry"].is_null());
    assert!(!caches["caches"][1]["entry"].is_null());
}

#[tokio::test]
async fn admin_writes_go_to_the_store_and_reload_the_cache() {
    let app = router(seeded_context(FailPolicy::Closed));
    let (status, _) = send(&app, "GET", "/old/1", &[]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "POST",
        "/admin/config/access-rules",
        serde_json::json!({
            "rule_name": "freeze-legacy",
            "rule_type": "blacklist",
            "match_type": "path",
            "match_pattern": "wildcard",
            "match_value": "/old/*",
            "priority": 200
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["record"]["id"].as_i64().unwrap();
    assert!(id > 2);

    let (status, body) = send(&app, "GET", "/old/1", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "GATEWAY.API_BLOCKED");

    let (status, _) = send(&app, "DELETE", &format!("/admin/config/access-rules/{id}"), &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/old/1", &[]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "DELETE", "/admin/config/access-rules/999", &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "STORAGE.NOT_FOUND");
}

#[tokio::test]
async fn admin_rejects_invalid_records() {
    let app = router(seeded_context(FailPolicy::Closed));
    let (status, _) = send_json(
        &app,
        "POST",
        "/admin/config/access-rules",
        serde_json::json!({
            "rule_name": "bad",
            "rule_type": "blacklist",
            "match_type": "path",
            "match_pattern": "cidr",
            "match_value": "10.0.0.0/8"
        }),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn blacklisted_path_is_rejected_with_error_body() {
    let app = router(seeded_context(FailPolicy::Open));
    let (status, body) = send(&app, "GET", "/secret/keys", &[("X-Request-Id", "abc")]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "GATEWAY.API_BLOCKED");
    assert_eq!(body["correlation_id"], "abc");
}

#[tokio::test]
async fn percent_encoded_path_cannot_evade_rules() {
    let mut config = config(FailPolicy::Open);
    config.server.default_service = Some("fallback".into());
    let context = seeded_context(FailPolicy::Open);
    let context = AppContext::with_stores(
        config,
        context.rule_store().clone(),
        context.mapping_store().clone(),
        None,
    )
    .unwrap();
    let app = router(context);

    let (status, body) = send(&app, "GET", "/%73ecret/keys", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "GATEWAY.API_BLOCKED");

    let (status, body) = send(&app, "GET", "/%FF/keys", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "GATEWAY.ACCESS_DENIED");

    let (status, body) = send(&app, "GET", "/public/%7Euser", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forward"]["original_path"], "/public/~user");
}

#[tokio::test]
async fn cidr_rule_uses_forwarded_client_address() {
    let app = router(seeded_context(FailPolicy::Open));
    let (status, body) = send(
        &app,
        "GET",
        "/old/1",
        &[("X-Forwarded-For", "203.0.113.77, 10.0.0.2")],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "GATEWAY.IP_BLOCKED");

    let (status, _) = send(&app, "GET", "/old/1", &[("X-Forwarded-For", "198.51.100.1")]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn allowed_request_is_rewritten_before_dispatch() {
    let app = router(seeded_context(FailPolicy::Closed));
    let (status, body) = send(&app, "GET", "/old/orders/9?expand=1", &[]).await;
    assert_eq!(status, StatusCode::OK);
    let plan = &body["forward"];
    assert_eq!(plan["path"], "/new/orders/9");
    assert_eq!(plan["original_path"], "/old/orders/9");
    assert_eq!(plan["target_service"], "order-service");
    assert_eq!(plan["headers"]["X-Original-Path"], "/old/orders/9");

    let (_, body) = send(&app, "GET", "/api/v1/users/42", &[]).await;
    assert_eq!(body["forward"]["path"], "/users/42");
    assert_eq!(body["forward"]["target_service"], "user-service");
}

#[tokio::test]
async fn unmapped_path_without_default_service_is_not_found() {
    let app = router(seeded_context(FailPolicy::Closed));
    let (status, body) = send(&app, "GET", "/nothing/here", &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "GATEWAY.ROUTE_NOT_FOUND");
}

#[tokio::test]
async fn admin_config_views_list_records_in_order() {
    let app = router(seeded_context(FailPolicy::Closed));
    let (_, body) = send(&app, "GET", "/admin/config/access-rules", &[]).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["fail_policy"], "closed");
    assert_eq!(body["rules"][0]["rule_name"], "block-admin");

    let (_, body) = send(&app, "GET", "/admin/config/url-mappings", &[]).await;
    assert_eq!(body["mappings"][0]["mapping_name"], "users");
}

#[tokio::test]
async fn info_and_health_describe_the_instance() {
    let app = router(seeded_context(FailPolicy::Closed));
    let (_, info) = send(&app, "GET", "/admin/info", &[]).await;
    assert_eq!(info["name"], "admission-gateway");
    assert_eq!(
        info["stages"],
        serde_json::json!(["access_control", "user_context", "path_rewrite", "dispatch", "monitoring"])
    );

    let (status, health) = send(&app, "GET", "/admin/health", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn metrics_endpoint_exports_pipeline_counters() {
    let app = router(seeded_context(FailPolicy::Closed));
    send(&app, "GET", "/old/1", &[]).await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("gateway_requests_total"));
    assert!(text.contains("gateway_cache_stats"));
}

struct DownStore;

#[async_trait]
impl<E: Record> Repository<E> for DownStore {
    async fn list_enabled(&self) -> Result<Vec<E>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn list_all(&self) -> Result<Vec<E>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn get(&self, _id: RecordId) -> Result<Option<E>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn save(&self, _entity: &E) -> Result<E, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete(&self, _id: RecordId) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
}

#[tokio::test]
async fn unreachable_store_applies_fail_policy() {
    let closed = AppContext::with_stores(
        config(FailPolicy::Closed),
        Arc::new(DownStore),
        Arc::new(DownStore),
        None,
    )
    .unwrap();
    let app = router(closed);
    let (status, body) = send(&app, "GET", "/old/1", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "GATEWAY.ACCESS_DENIED");

    let (status, body) = send(&app, "POST", "/admin/cache/access-rules/refresh", &[]).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "STORAGE.UNAVAILABLE");

    let mut open_config = config(FailPolicy::Open);
    open_config.server.default_service = Some("fallback".into());
    let open = AppContext::with_stores(open_config, Arc::new(DownStore), Arc::new(DownStore), None)
        .unwrap();
    let (status, body) = send(&router(open), "GET", "/old/1", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forward"]["target_service"], "fallback");
    assert_eq!(body["forward"]["path"], "/old/1");
}

#[test]
fn missing_fail_policy_refuses_to_start() {
    let memory = MemoryStore::new();
    let rules: InMemoryRepository<AccessRule> = InMemoryRepository::new(&memory);
    let mappings: InMemoryRepository<UrlMapping> = InMemoryRepository::new(&memory);
    let result = AppContext::with_stores(
        GatewayConfig::default(),
        Arc::new(rules),
        Arc::new(mappings),
        None,
    );
    assert!(result.is_err());
}

const RECORDS: &str = r#"
access_rules:
  - id: 1
    rule_name: no-trace
    rule_type: blacklist
    match_type: method
    match_pattern: exact
    match_value: TRACE
    priority: 10
url_mappings: []
"#;

#[test]
fn file_store_edits_are_picked_up_on_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.yaml");
    std::fs::write(&path, RECORDS).unwrap();

    let mut config = config(FailPolicy::Closed);
    config.store = StoreConfig::File { path: path.clone() };

    tokio_test::block_on(async {
        let context = AppContext::build(config).await.unwrap();
        assert_eq!(context.refresh_access_rules().await.unwrap(), 1);
        assert!(!context.access().is_allowed("/x", "trace", "10.0.0.1", None).await);

        let extended = RECORDS.replace(
            "url_mappings: []",
            "  - id: 2\n    rule_name: no-connect\n    rule_type: blacklist\n    match_type: method\n    match_pattern: exact\n    match_value: CONNECT\n    priority: 5\nurl_mappings: []",
        );
        std::fs::write(&path, extended).unwrap();
        assert_eq!(context.refresh_access_rules().await.unwrap(), 2);
    });
}

#[test]
fn memory_store_is_seeded_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seed.yaml");
    std::fs::write(&path, RECORDS).unwrap();

    let mut config = config(FailPolicy::Open);
    config.store = StoreConfig::Memory { seed: Some(path) };

    tokio_test::block_on(async {
        let context = AppContext::build(config).await.unwrap();
        assert!(context.warm_up().await.is_empty());
        assert_eq!(context.rules().entry_info().unwrap().count, 1);
        assert_eq!(context.mappings().entry_info().unwrap().count, 0);
    });
}
