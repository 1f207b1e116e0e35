//! Test helpers for running the pruner against a real S3-compatible store.

use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketVersioningStatus, VersioningConfiguration};
use common::config::{Configuration, ParameterSourceKind};
use testcontainers_modules::minio::MinIO;
use testcontainers_modules::testcontainers::{ContainerAsync, runners::AsyncRunner};
use tokio::time::sleep;

pub const MINIO_USER: &str = "minioadmin";
pub const MINIO_PASSWORD: &str = "minioadmin";
pub const MINIO_REGION: &str = "us-east-1";

/// Test context for MinIO container
pub struct MinioTestContext {
    pub container: ContainerAsync<MinIO>,
    pub endpoint: String,
    pub client: Client,
}

impl MinioTestContext {
    pub async fn new() -> Result<Self> {
        let container = MinIO::default().start().await?;
        let host_port = container.get_host_port_ipv4(9000).await?;
        let endpoint = format!("http://127.0.0.1:{host_port}");

        let credentials = Credentials::new(MINIO_USER, MINIO_PASSWORD, None, None, "test");
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .region(Region::new(MINIO_REGION))
            .load()
            .await;
        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(true)
                .build(),
        );

        Ok(Self {
            container,
            endpoint,
            client,
        })
    }

    /// Create `bucket` and turn versioning on, waiting for MinIO to come up.
    pub async fn create_versioned_bucket(&self, bucket: &str) -> Result<()> {
        let mut attempts = 0;
        const MAX_ATTEMPTS: u32 = 30;

        loop {
            match self.client.create_bucket().bucket(bucket).send().await {
                Ok(_) => break,
                Err(e) => {
                    attempts += 1;
                    if attempts >= MAX_ATTEMPTS {
                        return Err(anyhow::anyhow!(
                            "Failed to create bucket '{bucket}' after {MAX_ATTEMPTS} attempts: {e}"
                        ));
                    }
                    sleep(Duration::from_millis(500)).await;
                }
            }
        }

        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(
                VersioningConfiguration::builder()
                    .status(BucketVersioningStatus::Enabled)
                    .build(),
            )
            .send()
            .await?;

        tracing::debug!("Created versioned bucket '{bucket}'");
        Ok(())
    }

    /// Write a new version of `key` and return its version id.
    pub async fn put(&self, bucket: &str, key: &str, body: &'static [u8]) -> Result<String> {
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from_static(body))
            .send()
            .await?;
        output
            .version_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("bucket '{bucket}' is not versioned"))
    }

    /// Delete `key` without a version id, leaving a delete marker.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    /// Every (key, version id, is delete marker, is latest) left in `bucket`.
    pub async fn all_records(&self, bucket: &str) -> Result<Vec<(String, String, bool, bool)>> {
        let output = self
            .client
            .list_object_versions()
            .bucket(bucket)
            .send()
            .await?;

        let mut records = Vec::new();
        for v in output.versions() {
            records.push((
                v.key().unwrap_or_default().to_string(),
                v.version_id().unwrap_or_default().to_string(),
                false,
                v.is_latest().unwrap_or(false),
            ));
        }
        for m in output.delete_markers() {
            records.push((
                m.key().unwrap_or_default().to_string(),
                m.version_id().unwrap_or_default().to_string(),
                true,
                m.is_latest().unwrap_or(false),
            ));
        }
        Ok(records)
    }

    /// Configuration pointing at this container with an inline bucket list.
    pub fn configuration(&self, bucket_list: &str) -> Configuration {
        let mut config = Configuration::default();
        config.parameters.source = ParameterSourceKind::Inline;
        config
            .parameters
            .values
            .insert(config.parameters.key.clone(), bucket_list.to_string());
        config.aws.region = Some(MINIO_REGION.to_string());
        config.aws.endpoint_url = Some(self.endpoint.clone());
        config.aws.force_path_style = true;
        config.aws.access_key_id = Some(MINIO_USER.to_string());
        config.aws.secret_access_key = Some(MINIO_PASSWORD.to_string());
        config
    }
}

/// Initialize test logging
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
