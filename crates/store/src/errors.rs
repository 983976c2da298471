use admission_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub Box<ErrorObj>);

impl StoreError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }

    pub fn not_found(msg: &str) -> Self {
        StoreError(Box::new(
            ErrorBuilder::new(codes::STORAGE_NOT_FOUND)
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn conflict(msg: &str) -> Self {
        StoreError(Box::new(
            ErrorBuilder::new(codes::STORAGE_CONFLICT)
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn unavailable(msg: &str) -> Self {
        StoreError(Box::new(
            ErrorBuilder::new(codes::STORAGE_UNAVAILABLE)
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn bad_request(msg: &str) -> Self {
        StoreError(Box::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg("Invalid record.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn serialization(msg: &str) -> Self {
        StoreError(Box::new(
            ErrorBuilder::new(codes::SERIALIZATION)
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn internal(msg: &str) -> Self {
        StoreError(Box::new(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("Storage internal error.")
                .dev_msg(msg)
                .build(),
        ))
    }
}
