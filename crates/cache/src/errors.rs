use admission_errors::prelude::*;
use admission_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct CacheError(pub Box<ErrorObj>);

impl CacheError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }

    pub fn backend_unavailable(msg: &str) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::CACHE_ERROR)
                .user_msg("Cache backend unavailable.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn codec(msg: &str) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::CACHE_ERROR)
                .user_msg("Cache codec error.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn load_timeout(table: &str, timeout_ms: u64) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::STORAGE_TIMEOUT)
                .dev_msg(format!("loading {table} exceeded {timeout_ms}ms"))
                .meta_kv("table", serde_json::json!(table))
                .build(),
        ))
    }

    pub fn unknown(msg: &str) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("Cache internal error.")
                .dev_msg(msg)
                .build(),
        ))
    }
}

impl From<ErrorObj> for CacheError {
    fn from(value: ErrorObj) -> Self {
        Self(Box::new(value))
    }
}

impl From<StoreError> for CacheError {
    fn from(value: StoreError) -> Self {
        Self(value.0)
    }
}
