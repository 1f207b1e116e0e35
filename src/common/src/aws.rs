//! AWS SDK configuration shared by the S3 and SSM clients.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

use crate::config::AwsConfig;

/// Provider name reported for credentials taken from the configuration file.
const STATIC_CREDENTIALS_PROVIDER: &str = "bucketsweep-config";

/// Build an [`SdkConfig`] from the default provider chain with the
/// overrides from `[aws]` applied on top.
pub async fn load_sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(endpoint) = &aws.endpoint_url {
        tracing::debug!(endpoint = %endpoint, "Using custom AWS endpoint");
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&aws.access_key_id, &aws.secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            STATIC_CREDENTIALS_PROVIDER,
        ));
    }

    loader.load().await
}
