use std::sync::Arc;

use admission_cache::{mapping_cache, rule_cache};
use admission_core_types::{
    AccessRule, MatchPattern, MatchType, RecordId, RequestAttributes, RuleType, UrlMapping,
};
use admission_store::prelude::*;
use async_trait::async_trait;

use crate::access::engine::{AccessDecisionEngine, DecisionReason, FailPolicy};
use crate::rewrite::engine::PathRewriteEngine;

fn rule(
    id: RecordId,
    rule_type: RuleType,
    match_type: MatchType,
    pattern: MatchPattern,
    value: &str,
    priority: i32,
) -> AccessRule {
    AccessRule::new(id, format!("rule-{id}"), rule_type, match_type, pattern, value)
        .with_priority(priority)
}

fn engine_with(rules: &[AccessRule], policy: FailPolicy) -> AccessDecisionEngine {
    let store = MemoryStore::new();
    store.seed(rules);
    let repo: InMemoryRepository<AccessRule> = InMemoryRepository::new(&store);
    AccessDecisionEngine::new(rule_cache(Arc::new(repo)), policy)
}

fn rewrite_with(mappings: &[UrlMapping]) -> PathRewriteEngine {
    let store = MemoryStore::new();
    store.seed(mappings);
    let repo: InMemoryRepository<UrlMapping> = InMemoryRepository::new(&store);
    PathRewriteEngine::new(mapping_cache(Arc::new(repo)))
}

struct DownStore;

#[async_trait]
impl Repository<AccessRule> for DownStore {
    async fn list_enabled(&self) -> Result<Vec<AccessRule>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn list_all(&self) -> Result<Vec<AccessRule>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn get(&self, _id: RecordId) -> Result<Option<AccessRule>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn save(&self, _entity: &AccessRule) -> Result<AccessRule, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete(&self, _id: RecordId) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
}

#[tokio::test]
async fn no_rules_allows_everything() {
    let engine = engine_with(&[], FailPolicy::Closed);
    assert!(engine.is_allowed("/anything", "POST", "1.2.3.4", None).await);
    let decision = engine.evaluate(&RequestAttributes::new("GET", "/")).await;
    assert_eq!(decision.reason, DecisionReason::DefaultAllow);
    assert!(decision.error_code().is_none());
}

#[tokio::test]
async fn blacklist_beats_lower_priority_whitelist() {
    let engine = engine_with(
        &[
            rule(1, RuleType::Whitelist, MatchType::Path, MatchPattern::Prefix, "/", 1),
            rule(2, RuleType::Blacklist, MatchType::Path, MatchPattern::Exact, "/admin", 100),
        ],
        FailPolicy::Open,
    );
    let decision = engine.evaluate(&RequestAttributes::new("GET", "/admin")).await;
    assert!(!decision.allowed);
    assert_eq!(decision.rule_name(), Some("rule-2"));
    assert_eq!(decision.error_code().map(|c| c.0), Some("GATEWAY.API_BLOCKED"));
    assert!(engine.is_allowed("/public", "GET", "1.1.1.1", None).await);
}

#[tokio::test]
async fn same_priority_smaller_id_wins() {
    let engine = engine_with(
        &[
            rule(8, RuleType::Blacklist, MatchType::Path, MatchPattern::Prefix, "/api", 10),
            rule(3, RuleType::Whitelist, MatchType::Path, MatchPattern::Prefix, "/api", 10),
        ],
        FailPolicy::Open,
    );
    let decision = engine.evaluate(&RequestAttributes::new("GET", "/api/x")).await;
    assert!(decision.allowed);
    assert!(matches!(decision.reason, DecisionReason::Whitelisted { rule_id: 3, .. }));
}

#[tokio::test]
async fn whitelist_mode_is_closed_world() {
    let engine = engine_with(
        &[rule(1, RuleType::Whitelist, MatchType::Ip, MatchPattern::Cidr, "10.0.0.0/8", 5)],
        FailPolicy::Open,
    );
    assert!(engine.is_allowed("/x", "GET", "10.4.4.4", None).await);
    let denied = engine
        .evaluate(&RequestAttributes::new("GET", "/x").with_client_ip("192.168.1.1"))
        .await;
    assert!(!denied.allowed);
    assert_eq!(denied.reason, DecisionReason::ImplicitDeny);
    assert_eq!(denied.error_code().map(|c| c.0), Some("GATEWAY.ACCESS_DENIED"));
}

#[tokio::test]
async fn disabled_rules_are_skipped() {
    let engine = engine_with(
        &[rule(1, RuleType::Blacklist, MatchType::Path, MatchPattern::Prefix, "/", 1).disabled()],
        FailPolicy::Closed,
    );
    assert!(engine.is_allowed("/x", "GET", "1.1.1.1", None).await);
}

#[tokio::test]
async fn broken_rule_is_isolated() {
    let engine = engine_with(
        &[
            rule(1, RuleType::Blacklist, MatchType::Path, MatchPattern::Regex, "([", 100),
            rule(2, RuleType::Blacklist, MatchType::Ip, MatchPattern::Cidr, "not-a-net", 90),
            rule(3, RuleType::Blacklist, MatchType::Path, MatchPattern::Cidr, "10.0.0.0/8", 80),
            rule(4, RuleType::Blacklist, MatchType::User, MatchPattern::Exact, "mallory", 1),
        ],
        FailPolicy::Open,
    );
    let request = RequestAttributes::new("GET", "/x")
        .with_client_ip("10.0.0.1")
        .with_user("mallory");
    let decision = engine.evaluate(&request).await;
    assert!(!decision.allowed);
    assert_eq!(decision.rules_evaluated, 4);
    assert_eq!(decision.error_code().map(|c| c.0), Some("GATEWAY.USER_BLOCKED"));
}

#[tokio::test]
async fn ip_blacklist_uses_ip_code() {
    let engine = engine_with(
        &[rule(1, RuleType::Blacklist, MatchType::Ip, MatchPattern::Cidr, "203.0.113.0/24", 1)],
        FailPolicy::Open,
    );
    let decision = engine
        .evaluate(&RequestAttributes::new("GET", "/").with_client_ip("203.0.113.9"))
        .await;
    assert_eq!(decision.error_code().map(|c| c.0), Some("GATEWAY.IP_BLOCKED"));
}

#[tokio::test]
async fn degraded_rule_set_applies_fail_policy() {
    let closed = AccessDecisionEngine::new(rule_cache(Arc::new(DownStore)), FailPolicy::Closed);
    let decision = closed.evaluate(&RequestAttributes::new("GET", "/")).await;
    assert!(!decision.allowed);
    assert_eq!(
        decision.reason,
        DecisionReason::FailPolicy {
            policy: FailPolicy::Closed
        }
    );
    assert_eq!(decision.error_code().map(|c| c.0), Some("GATEWAY.ACCESS_DENIED"));

    let open = AccessDecisionEngine::new(rule_cache(Arc::new(DownStore)), FailPolicy::Open);
    assert!(open.is_allowed("/", "GET", "unknown", None).await);
}

#[test]
fn fail_policy_parses() {
    assert_eq!("Closed".parse::<FailPolicy>().unwrap(), FailPolicy::Closed);
    assert_eq!("allow".parse::<FailPolicy>().unwrap(), FailPolicy::Open);
    assert!("maybe".parse::<FailPolicy>().is_err());
}

#[tokio::test]
async fn resolve_and_rewrite_wildcard_mapping() {
    let engine = rewrite_with(&[UrlMapping::new(1, "legacy", "/old/**", "/new/**", "legacy-svc")]);

    let mapping = engine.resolve("/old/123").await.unwrap();
    assert_eq!(engine.rewrite("/old/123", &mapping), "/new/123");
    assert_eq!(engine.rewrite("/old", &mapping), "/new");

    let result = engine.apply("/old/a/b").await.unwrap();
    assert_eq!(result.rewritten_path, "/new/a/b");
    assert_eq!(result.target_service, "legacy-svc");
    assert!(result.changed);
    assert!(engine.apply("/elsewhere").await.is_none());
}

#[tokio::test]
async fn first_mapping_by_priority_wins() {
    let engine = rewrite_with(&[
        UrlMapping::new(1, "broad", "/api/**", "/internal/**", "gateway").with_priority(1),
        UrlMapping::new(2, "orders", "/api/orders/**", "/orders/**", "orders").with_priority(10),
        UrlMapping::new(3, "off", "/api/**", "/off/**", "off")
            .with_priority(99)
            .disabled(),
    ]);
    let result = engine.apply("/api/orders/7").await.unwrap();
    assert_eq!(result.mapping_name, "orders");
    assert_eq!(result.rewritten_path, "/orders/7");

    let fallback = engine.apply("/api/users").await.unwrap();
    assert_eq!(fallback.target_service, "gateway");
    assert_eq!(fallback.rewritten_path, "/internal/users");
}

#[tokio::test]
async fn prefix_rewrite_example() {
    let engine = rewrite_with(&[]);
    let mapping = UrlMapping::new(1, "v1", "/api/v1", "/v1", "users");
    assert_eq!(engine.rewrite("/api/v1/users", &mapping), "/v1/users");
}

#[tokio::test]
async fn regex_mapping_routes_without_changing_path() {
    let engine = rewrite_with(&[UrlMapping::new(1, "versions", "regex:/v[0-9]+/.*", "/svc", "versioned")]);
    let result = engine.apply("/v3/items").await.unwrap();
    assert_eq!(result.target_service, "versioned");
    assert!(!result.changed);
}

#[tokio::test]
async fn invalid_mapping_passes_path_through() {
    let engine = rewrite_with(&[]);
    let relative = UrlMapping::new(1, "bad", "/a/**", "b/**", "svc");
    assert!(engine.try_rewrite("/a/x", &relative).is_err());
    assert_eq!(engine.rewrite("/a/x", &relative), "/a/x");

    let bad_regex = UrlMapping::new(2, "bad-re", "regex:(", "/b", "svc");
    assert!(matches!(
        engine.try_rewrite("/(", &bad_regex),
        Err(crate::errors::RewriteError::InvalidRegex { .. })
    ));
}
