use std::collections::HashMap;

use async_trait::async_trait;

use super::ParameterSource;
use crate::error::ConfigError;

/// Parameters held in memory, typically the `[parameters.values]` table of
/// the configuration file.
#[derive(Debug, Clone, Default)]
pub struct InlineParameterSource {
    values: HashMap<String, String>,
}

impl InlineParameterSource {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[async_trait]
impl ParameterSource for InlineParameterSource {
    async fn get_parameter(&self, key: &str) -> Result<String, ConfigError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound {
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_stored_value() {
        let source = InlineParameterSource::from_pairs([("/buckets", "a,b")]);
        assert_eq!(source.get_parameter("/buckets").await.unwrap(), "a,b");
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let source = InlineParameterSource::default();
        let err = source.get_parameter("/missing").await.unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { ref key } if key == "/missing"));
    }
}
