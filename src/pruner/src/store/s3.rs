use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;

use super::{DELETE_OPERATION, LIST_OPERATION, VersionStore};
use crate::error::StoreError;
use crate::model::{ContinuationToken, DeleteMarker, ListingPage, ObjectVersion};

/// Version id S3 reports for objects written before versioning was enabled.
const NULL_VERSION_ID: &str = "null";

/// [`VersionStore`] backed by the S3 `ListObjectVersions` and `DeleteObject` APIs.
#[derive(Debug, Clone)]
pub struct S3VersionStore {
    client: Client,
    page_size: i32,
}

impl S3VersionStore {
    pub fn new(client: Client, page_size: i32) -> Self {
        Self { client, page_size }
    }

    /// Build a client from shared SDK configuration.
    ///
    /// `force_path_style` is needed for most S3-compatible stores (MinIO).
    pub fn from_sdk_config(sdk_config: &SdkConfig, force_path_style: bool, page_size: i32) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(force_path_style)
            .build();
        Self::new(Client::from_conf(s3_config), page_size)
    }
}

#[async_trait]
impl VersionStore for S3VersionStore {
    async fn list_object_versions(
        &self,
        bucket: &str,
        token: Option<&ContinuationToken>,
    ) -> Result<ListingPage, StoreError> {
        let mut request = self
            .client
            .list_object_versions()
            .bucket(bucket)
            .max_keys(self.page_size);

        if let Some(token) = token {
            request = request
                .set_key_marker(token.key_marker.clone())
                .set_version_id_marker(token.version_id_marker.clone());
        }

        let output = request.send().await.map_err(|e| {
            StoreError::request(LIST_OPERATION, DisplayErrorContext(&e).to_string())
        })?;

        Ok(page_from_output(output))
    }

    async fn delete_object_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| {
                StoreError::request(DELETE_OPERATION, DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }
}

/// Convert an SDK response into a [`ListingPage`].
///
/// Entries without a key cannot be addressed and are dropped.
fn page_from_output(output: ListObjectVersionsOutput) -> ListingPage {
    let versions = output.versions.map(|versions| {
        versions
            .into_iter()
            .filter_map(|v| {
                Some(ObjectVersion {
                    key: v.key?,
                    version_id: v.version_id.unwrap_or_else(|| NULL_VERSION_ID.to_string()),
                    is_latest: v.is_latest.unwrap_or(false),
                })
            })
            .collect()
    });

    let delete_markers = output.delete_markers.map(|markers| {
        markers
            .into_iter()
            .filter_map(|m| {
                Some(DeleteMarker {
                    key: m.key?,
                    version_id: m.version_id.unwrap_or_else(|| NULL_VERSION_ID.to_string()),
                    is_latest: m.is_latest.unwrap_or(false),
                })
            })
            .collect()
    });

    let next = if output.is_truncated.unwrap_or(false) {
        Some(ContinuationToken {
            key_marker: output.next_key_marker,
            version_id_marker: output.next_version_id_marker,
        })
    } else {
        None
    };

    ListingPage {
        versions,
        delete_markers,
        next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use aws_sdk_s3::config::interceptors::BeforeTransmitInterceptorContextRef;
    use aws_sdk_s3::config::retry::RetryConfig as SdkRetryConfig;
    use aws_sdk_s3::config::{
        BehaviorVersion, ConfigBag, Credentials, Intercept, Region, RuntimeComponents,
    };
    use aws_sdk_s3::error::BoxError;
    use aws_sdk_s3::types::{DeleteMarkerEntry, ObjectVersion as S3ObjectVersion};

    /// Records the outgoing request URI and stops the call before it is sent.
    #[derive(Debug, Clone, Default)]
    struct CaptureUri(Arc<Mutex<Vec<String>>>);

    impl Intercept for CaptureUri {
        fn name(&self) -> &'static str {
            "CaptureUri"
        }

        fn read_before_transmit(
            &self,
            context: &BeforeTransmitInterceptorContextRef<'_>,
            _runtime_components: &RuntimeComponents,
            _cfg: &mut ConfigBag,
        ) -> Result<(), BoxError> {
            self.0
                .lock()
                .unwrap()
                .push(context.request().uri().to_string());
            Err("request captured".into())
        }
    }

    fn capturing_store(page_size: i32) -> (S3VersionStore, CaptureUri) {
        let capture = CaptureUri::default();
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url("http://127.0.0.1:9000")
            .force_path_style(true)
            .retry_config(SdkRetryConfig::disabled())
            .interceptor(capture.clone())
            .build();
        (S3VersionStore::new(Client::from_conf(config), page_size), capture)
    }

    #[tokio::test]
    async fn test_first_page_request_has_no_markers() {
        let (store, capture) = capturing_store(250);

        let err = store.list_object_versions("logs", None).await.unwrap_err();

        assert!(matches!(err, StoreError::Request { operation, .. } if operation == LIST_OPERATION));
        let uris = capture.0.lock().unwrap().clone();
        assert_eq!(uris.len(), 1);
        assert!(uris[0].contains("/logs"), "uri: {}", uris[0]);
        assert!(uris[0].contains("versions"), "uri: {}", uris[0]);
        assert!(uris[0].contains("max-keys=250"), "uri: {}", uris[0]);
        assert!(!uris[0].contains("key-marker"), "uri: {}", uris[0]);
    }

    #[tokio::test]
    async fn test_continuation_token_is_sent_as_markers() {
        let (store, capture) = capturing_store(2);
        let token = ContinuationToken {
            key_marker: Some("report.txt".to_string()),
            version_id_marker: Some("v2".to_string()),
        };

        let _ = store.list_object_versions("logs", Some(&token)).await;

        let uris = capture.0.lock().unwrap().clone();
        assert_eq!(uris.len(), 1);
        assert!(uris[0].contains("key-marker=report.txt"), "uri: {}", uris[0]);
        assert!(uris[0].contains("version-id-marker=v2"), "uri: {}", uris[0]);
        assert!(uris[0].contains("max-keys=2"), "uri: {}", uris[0]);
    }

    #[tokio::test]
    async fn test_delete_addresses_one_version() {
        let (store, capture) = capturing_store(1000);

        let err = store
            .delete_object_version("logs", "report.txt", "v1")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Request { operation, .. } if operation == DELETE_OPERATION));
        let uris = capture.0.lock().unwrap().clone();
        assert_eq!(uris.len(), 1);
        assert!(uris[0].contains("/logs/report.txt"), "uri: {}", uris[0]);
        assert!(uris[0].contains("versionId=v1"), "uri: {}", uris[0]);
    }

    #[test]
    fn test_truncated_output_carries_both_markers() {
        let output = ListObjectVersionsOutput::builder()
            .versions(
                S3ObjectVersion::builder()
                    .key("report.txt")
                    .version_id("v1")
                    .is_latest(false)
                    .build(),
            )
            .versions(
                S3ObjectVersion::builder()
                    .key("report.txt")
                    .version_id("v2")
                    .is_latest(true)
                    .build(),
            )
            .is_truncated(true)
            .next_key_marker("report.txt")
            .next_version_id_marker("v2")
            .build();

        let page = page_from_output(output);

        assert_eq!(page.versions().len(), 2);
        assert!(!page.versions()[0].is_latest);
        assert!(page.versions()[1].is_latest);
        assert!(page.delete_markers.is_none());
        assert_eq!(
            page.next,
            Some(ContinuationToken {
                key_marker: Some("report.txt".to_string()),
                version_id_marker: Some("v2".to_string()),
            })
        );
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let output = ListObjectVersionsOutput::builder()
            .delete_markers(
                DeleteMarkerEntry::builder()
                    .key("gone.txt")
                    .version_id("dm1")
                    .is_latest(true)
                    .build(),
            )
            .is_truncated(false)
            .next_key_marker("ignored")
            .build();

        let page = page_from_output(output);

        assert!(page.versions.is_none());
        assert_eq!(page.delete_markers().len(), 1);
        assert!(page.delete_markers()[0].is_latest);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_missing_version_id_maps_to_null_version() {
        let output = ListObjectVersionsOutput::builder()
            .versions(S3ObjectVersion::builder().key("legacy.bin").build())
            .versions(S3ObjectVersion::builder().version_id("orphan").build())
            .build();

        let page = page_from_output(output);

        assert_eq!(page.versions().len(), 1);
        assert_eq!(page.versions()[0].version_id, "null");
        assert!(!page.versions()[0].is_latest);
    }
}
