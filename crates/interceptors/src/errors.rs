use admission_errors::prelude::*;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct InterceptError(pub ErrorObj);

impl InterceptError {
    pub fn into_inner(self) -> ErrorObj {
        self.0
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }

    pub fn status(&self) -> u16 {
        self.0.http_status
    }

    pub fn internal(msg: &str) -> Self {
        InterceptError(
            ErrorBuilder::new(codes::INTERNAL_ERROR)
                .dev_msg(msg)
                .build(),
        )
    }

    pub fn config(msg: &str) -> Self {
        InterceptError(
            ErrorBuilder::new(codes::CONFIG_ERROR)
                .dev_msg(msg)
                .build(),
        )
    }

    pub fn from_error(err: ErrorObj) -> Self {
        InterceptError(err)
    }

    pub fn from_public(code: ErrorCode, msg: &str) -> Self {
        InterceptError(ErrorBuilder::new(code).user_msg(msg).build())
    }

    /// Rejection for a request the access rules denied.
    pub fn denied(code: ErrorCode, reason: &str, rule: Option<&str>, request_id: &str) -> Self {
        let mut builder = ErrorBuilder::new(code)
            .dev_msg(reason)
            .correlation(request_id);
        if let Some(rule) = rule {
            builder = builder.meta_kv("rule", json!(rule));
        }
        InterceptError(builder.build())
    }

    pub fn service_unavailable(service: &str, msg: &str) -> Self {
        InterceptError(
            ErrorBuilder::new(codes::SERVICE_UNAVAILABLE)
                .dev_msg(msg)
                .meta_kv("target_service", json!(service))
                .build(),
        )
    }

    pub fn route_not_found(path: &str) -> Self {
        InterceptError(
            ErrorBuilder::new(codes::ROUTE_NOT_FOUND)
                .dev_msg(format!("no route for {path}"))
                .build(),
        )
    }

    pub fn with_correlation(mut self, request_id: &str) -> Self {
        if self.0.correlation_id.is_none() {
            self.0.correlation_id = Some(request_id.to_string());
        }
        self
    }
}

pub fn to_http_response(err: &InterceptError) -> (u16, serde_json::Value) {
    let obj = &err.0;
    let public = obj.to_public();
    (
        obj.http_status,
        json!({
            "code": public.code,
            "message": public.message,
            "correlation_id": public.correlation_id
        }),
    )
}
