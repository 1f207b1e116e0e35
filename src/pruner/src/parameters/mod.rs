//! Configuration Resolver: turns a parameter key into the bucket list.

pub mod inline;
pub mod ssm;

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::model::BucketId;

pub use inline::InlineParameterSource;
pub use ssm::SsmParameterSource;

/// Separator between bucket identifiers in the parameter value.
pub const BUCKET_LIST_DELIMITER: char = ',';

/// Read-only key/value configuration store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParameterSource: Send + Sync {
    /// Return the raw value for `key`, or [`ConfigError::NotFound`].
    async fn get_parameter(&self, key: &str) -> Result<String, ConfigError>;
}

/// Fetch `key` from `source` and parse it as a bucket list.
pub async fn resolve_bucket_list(
    source: &dyn ParameterSource,
    key: &str,
) -> Result<Vec<BucketId>, ConfigError> {
    let value = source.get_parameter(key).await?;
    let buckets = parse_bucket_list(key, &value)?;

    tracing::info!(
        parameter_key = %key,
        buckets = buckets.len(),
        "Resolved bucket list"
    );

    Ok(buckets)
}

/// Split a comma-separated bucket list.
///
/// Entries are trimmed and empty entries dropped; order and duplicates are
/// kept. A value that yields no identifiers, or an identifier with embedded
/// whitespace (typically a newline-separated list), is malformed.
pub fn parse_bucket_list(key: &str, value: &str) -> Result<Vec<BucketId>, ConfigError> {
    let malformed = |reason: String| ConfigError::Malformed {
        key: key.to_string(),
        reason,
    };

    if value.trim().is_empty() {
        return Err(malformed("value is empty".to_string()));
    }

    let mut buckets = Vec::new();
    for entry in value.split(BUCKET_LIST_DELIMITER) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if entry.chars().any(char::is_whitespace) {
            return Err(malformed(format!(
                "bucket identifier {entry:?} contains whitespace"
            )));
        }
        buckets.push(entry.to_string());
    }

    if buckets.is_empty() {
        return Err(malformed("no bucket identifiers in value".to_string()));
    }

    Ok(buckets)
}
