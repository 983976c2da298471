use admission_errors::prelude::*;
use serde_json::json;
use thiserror::Error;

/// Why a single rule could not be evaluated. The rule is then treated as non-matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("invalid cidr '{0}'")]
    InvalidCidr(String),
    #[error("pattern {pattern} is not supported for match type {match_type}")]
    Unsupported {
        match_type: &'static str,
        pattern: &'static str,
    },
}

/// A mapping that cannot be applied. The original path passes through.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("mapping {mapping}: {field} must not be empty")]
    EmptyPath {
        mapping: String,
        field: &'static str,
    },
    #[error("mapping {mapping}: {field} '{path}' must start with '/'")]
    NotAbsolute {
        mapping: String,
        field: &'static str,
        path: String,
    },
    #[error("mapping {mapping}: invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        mapping: String,
        pattern: String,
        reason: String,
    },
}

impl From<MatchError> for ErrorObj {
    fn from(value: MatchError) -> Self {
        ErrorBuilder::new(codes::CONFIG_ERROR)
            .dev_msg(value.to_string())
            .build()
    }
}

impl From<RewriteError> for ErrorObj {
    fn from(value: RewriteError) -> Self {
        let mapping = match &value {
            RewriteError::EmptyPath { mapping, .. }
            | RewriteError::NotAbsolute { mapping, .. }
            | RewriteError::InvalidRegex { mapping, .. } => mapping.clone(),
        };
        ErrorBuilder::new(codes::CONFIG_ERROR)
            .dev_msg(value.to_string())
            .meta_kv("mapping", json!(mapping))
            .build()
    }
}
