use admission_errors::prelude::*;
use serde_json::json;

#[test]
fn build_and_render_public() {
    let err = ErrorBuilder::new(codes::IP_BLOCKED)
        .dev_msg("rule 'block-office' matched 10.0.0.7")
        .meta_kv("rule", json!("block-office"))
        .correlation("req-123")
        .build();

    let public_view = err.to_public();
    assert_eq!(public_view.code, "GATEWAY.IP_BLOCKED");
    assert_eq!(public_view.message, "Your IP address is blocked.");
    assert_eq!(public_view.correlation_id, Some("req-123"));
    assert_eq!(err.http_status, 403);

    let rendered = serde_json::to_string(&public_view).unwrap();
    assert!(!rendered.contains("block-office"));
}

#[test]
fn labels_carry_registry_fields_only() {
    let err = ErrorBuilder::new(codes::IP_BLOCKED)
        .meta_kv("rule", json!("block-office"))
        .build();
    let values = labels(&err);
    assert_eq!(LABEL_NAMES.len(), values.len());
    assert_eq!(values, ["GATEWAY.IP_BLOCKED", "PolicyDeny", "permanent", "warn"]);
}

#[test]
fn audit_view_keeps_developer_detail() {
    let err = ErrorBuilder::new(codes::STORAGE_UNAVAILABLE)
        .dev_msg("connection refused")
        .meta_kv("table", json!("access_rules"))
        .build();
    let audit = err.to_audit();
    assert_eq!(audit.status, 503);
    assert_eq!(audit.retryable, "transient");
    assert_eq!(audit.detail, Some("connection refused"));

    let rendered = serde_json::to_value(&audit).unwrap();
    assert_eq!(rendered["meta"]["table"], "access_rules");
    assert!(rendered.get("correlation_id").is_none());
}

#[test]
fn only_faults_are_loud() {
    assert!(!ErrorBuilder::new(codes::API_BLOCKED).build().severity.is_fault());
    assert!(ErrorBuilder::new(codes::STORAGE_UNAVAILABLE).build().severity.is_fault());
    assert!(Severity::Critical > Severity::Warn);
}

#[test]
fn error_code_deserializes_only_registered_codes() {
    let code: ErrorCode = serde_json::from_value(json!("GATEWAY.ACCESS_DENIED")).unwrap();
    assert_eq!(code, codes::ACCESS_DENIED);
    assert!(serde_json::from_value::<ErrorCode>(json!("NOPE.NOTHING")).is_err());
}
