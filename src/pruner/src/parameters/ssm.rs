use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::operation::get_parameter::GetParameterError;

use super::ParameterSource;
use crate::error::ConfigError;

/// [`ParameterSource`] backed by AWS Systems Manager Parameter Store.
///
/// Values are requested with decryption so `SecureString` parameters work
/// the same as plain `String` / `StringList` ones.
#[derive(Debug, Clone)]
pub struct SsmParameterSource {
    client: Client,
}

impl SsmParameterSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

#[async_trait]
impl ParameterSource for SsmParameterSource {
    async fn get_parameter(&self, key: &str) -> Result<String, ConfigError> {
        let output = self
            .client
            .get_parameter()
            .name(key)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                GetParameterError::ParameterNotFound(_)
                | GetParameterError::ParameterVersionNotFound(_) => ConfigError::NotFound {
                    key: key.to_string(),
                },
                other => ConfigError::Unavailable {
                    key: key.to_string(),
                    message: DisplayErrorContext(&other).to_string(),
                },
            })?;

        output
            .parameter
            .and_then(|parameter| parameter.value)
            .ok_or_else(|| ConfigError::Malformed {
                key: key.to_string(),
                reason: "parameter has no value".to_string(),
            })
    }
}
