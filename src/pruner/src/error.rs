use std::time::Duration;

use thiserror::Error;

/// Failure to obtain the bucket list. Always fatal for a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration parameter {key} not found")]
    NotFound { key: String },

    #[error("configuration parameter {key} is malformed: {reason}")]
    Malformed { key: String, reason: String },

    #[error("configuration store unavailable while reading {key}: {message}")]
    Unavailable { key: String, message: String },
}

/// Failure of a single call against the version store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn request(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to resolve bucket list: {0}")]
    Configuration(#[from] ConfigError),
}
