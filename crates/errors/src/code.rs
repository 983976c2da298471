use crate::{kind::ErrorKind, retry::RetryClass, severity::Severity};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub &'static str);

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match REGISTRY.get_key_value(s.as_str()) {
            Some((key, _)) => Ok(ErrorCode(key)),
            None => Err(serde::de::Error::custom(format!("unknown error code: {s}"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CodeSpec {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub http_status: u16,
    pub retryable: RetryClass,
    pub severity: Severity,
    pub default_user_msg: &'static str,
}

pub mod codes {
    use super::ErrorCode;
    pub const ACCESS_DENIED: ErrorCode = ErrorCode("GATEWAY.ACCESS_DENIED");
    pub const IP_BLOCKED: ErrorCode = ErrorCode("GATEWAY.IP_BLOCKED");
    pub const USER_BLOCKED: ErrorCode = ErrorCode("GATEWAY.USER_BLOCKED");
    pub const API_BLOCKED: ErrorCode = ErrorCode("GATEWAY.API_BLOCKED");
    pub const TOKEN_INVALID: ErrorCode = ErrorCode("GATEWAY.TOKEN_INVALID");
    pub const TOKEN_EXPIRED: ErrorCode = ErrorCode("GATEWAY.TOKEN_EXPIRED");
    pub const TOKEN_MISSING: ErrorCode = ErrorCode("GATEWAY.TOKEN_MISSING");
    pub const SERVICE_UNAVAILABLE: ErrorCode = ErrorCode("GATEWAY.SERVICE_UNAVAILABLE");
    pub const ROUTE_NOT_FOUND: ErrorCode = ErrorCode("GATEWAY.ROUTE_NOT_FOUND");
    pub const INTERNAL_ERROR: ErrorCode = ErrorCode("GATEWAY.INTERNAL_ERROR");
    pub const CONFIG_ERROR: ErrorCode = ErrorCode("GATEWAY.CONFIG_ERROR");
    pub const CACHE_ERROR: ErrorCode = ErrorCode("GATEWAY.CACHE_ERROR");
    pub const SCHEMA_VALIDATION: ErrorCode = ErrorCode("SCHEMA.VALIDATION_FAILED");
    pub const STORAGE_NOT_FOUND: ErrorCode = ErrorCode("STORAGE.NOT_FOUND");
    pub const STORAGE_CONFLICT: ErrorCode = ErrorCode("STORAGE.CONFLICT");
    pub const STORAGE_UNAVAILABLE: ErrorCode = ErrorCode("STORAGE.UNAVAILABLE");
    pub const STORAGE_TIMEOUT: ErrorCode = ErrorCode("STORAGE.TIMEOUT");
    pub const SERIALIZATION: ErrorCode = ErrorCode("SERIALIZATION.FAILED");
    pub const PROVIDER_UNAVAILABLE: ErrorCode = ErrorCode("PROVIDER.UNAVAILABLE");
    pub const UNKNOWN_INTERNAL: ErrorCode = ErrorCode("UNKNOWN.INTERNAL");
}

pub static REGISTRY: Lazy<HashMap<&'static str, CodeSpec>> = Lazy::new(|| {
    use codes::*;

    let mut map = HashMap::new();
    let mut add = |spec: CodeSpec| {
        let key = spec.code.0;
        if map.insert(key, spec).is_some() {
            panic!("duplicate error code: {}", key);
        }
    };

    add(CodeSpec {
        code: ACCESS_DENIED,
        kind: ErrorKind::PolicyDeny,
        http_status: 403,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "Access denied.",
    });

    add(CodeSpec {
        code: IP_BLOCKED,
        kind: ErrorKind::PolicyDeny,
        http_status: 403,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "Your IP address is blocked.",
    });

    add(CodeSpec {
        code: USER_BLOCKED,
        kind: ErrorKind::PolicyDeny,
        http_status: 403,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "This user is blocked.",
    });

    add(CodeSpec {
        code: API_BLOCKED,
        kind: ErrorKind::PolicyDeny,
        http_status: 403,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "This API is blocked.",
    });

    add(CodeSpec {
        code: TOKEN_INVALID,
        kind: ErrorKind::Auth,
        http_status: 401,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "The access token is invalid.",
    });

    add(CodeSpec {
        code: TOKEN_EXPIRED,
        kind: ErrorKind::Auth,
        http_status: 401,
        retryable: RetryClass::Permanent,
        severity: Severity::Info,
        default_user_msg: "The access token has expired.",
    });

    add(CodeSpec {
        code: TOKEN_MISSING,
        kind: ErrorKind::Auth,
        http_status: 401,
        retryable: RetryClass::Permanent,
        severity: Severity::Info,
        default_user_msg: "Please sign in.",
    });

    add(CodeSpec {
        code: SERVICE_UNAVAILABLE,
        kind: ErrorKind::Routing,
        http_status: 503,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "The target service is unavailable. Please retry later.",
    });

    add(CodeSpec {
        code: ROUTE_NOT_FOUND,
        kind: ErrorKind::Routing,
        http_status: 404,
        retryable: RetryClass::Permanent,
        severity: Severity::Info,
        default_user_msg: "No route matches this request.",
    });

    add(CodeSpec {
        code: INTERNAL_ERROR,
        kind: ErrorKind::Unknown,
        http_status: 500,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Gateway internal error.",
    });

    add(CodeSpec {
        code: CONFIG_ERROR,
        kind: ErrorKind::Config,
        http_status: 500,
        retryable: RetryClass::Permanent,
        severity: Severity::Critical,
        default_user_msg: "Gateway configuration error.",
    });

    add(CodeSpec {
        code: CACHE_ERROR,
        kind: ErrorKind::Cache,
        http_status: 503,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Gateway cache error.",
    });

    add(CodeSpec {
        code: SCHEMA_VALIDATION,
        kind: ErrorKind::Schema,
        http_status: 422,
        retryable: RetryClass::Permanent,
        severity: Severity::Warn,
        default_user_msg: "Your request is invalid. Please check inputs.",
    });

    add(CodeSpec {
        code: STORAGE_NOT_FOUND,
        kind: ErrorKind::NotFound,
        http_status: 404,
        retryable: RetryClass::Permanent,
        severity: Severity::Info,
        default_user_msg: "Resource not found.",
    });

    add(CodeSpec {
        code: STORAGE_CONFLICT,
        kind: ErrorKind::Conflict,
        http_status: 409,
        retryable: RetryClass::Transient,
        severity: Severity::Warn,
        default_user_msg: "The resource was modified concurrently. Please retry.",
    });

    add(CodeSpec {
        code: STORAGE_UNAVAILABLE,
        kind: ErrorKind::Storage,
        http_status: 503,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Storage backend is unavailable. Please retry later.",
    });

    add(CodeSpec {
        code: STORAGE_TIMEOUT,
        kind: ErrorKind::Timeout,
        http_status: 504,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Storage backend did not respond in time.",
    });

    add(CodeSpec {
        code: SERIALIZATION,
        kind: ErrorKind::Serialization,
        http_status: 500,
        retryable: RetryClass::Permanent,
        severity: Severity::Error,
        default_user_msg: "Failed to encode or decode data.",
    });

    add(CodeSpec {
        code: PROVIDER_UNAVAILABLE,
        kind: ErrorKind::Provider,
        http_status: 503,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Upstream provider is unavailable. Please retry later.",
    });

    add(CodeSpec {
        code: UNKNOWN_INTERNAL,
        kind: ErrorKind::Unknown,
        http_status: 500,
        retryable: RetryClass::Transient,
        severity: Severity::Error,
        default_user_msg: "Internal error. Please retry later.",
    });

    map
});

pub fn spec_of(code: ErrorCode) -> &'static CodeSpec {
    REGISTRY.get(code.0).expect("unregistered ErrorCode")
}
