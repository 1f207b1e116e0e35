//! Bucket Version Pruner.
//!
//! Walks every page of a bucket's version listing and deletes:
//!
//! - every version whose `is_latest` flag is false
//! - every delete marker, current or not
//!
//! Markers are removed regardless of `is_latest`. Removing a current marker
//! on its own would make the key visible again, but the versions under it were
//! non-current when listed and are deleted in the same pass, so a key hidden
//! by a marker ends up with no records at all.
//!
//! Each page is listed after the previous page's deletions, so once a current
//! marker is gone the next page reports the newest surviving version of that
//! key as current. Listings are ordered by key, so remembering the last key
//! whose current marker was seen is enough to keep treating its remaining
//! versions as non-current, whatever the page size.
//!
//! Pages are processed as they arrive, so memory stays bounded by the page
//! size. A listing failure abandons the bucket; a deletion failure is recorded
//! and the walk continues.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::config::{PrunerConfig, RetryConfig};

use crate::error::StoreError;
use crate::model::{ContinuationToken, ListingPage, RecordKind};
use crate::report::{ItemFailure, PruneReport};
use crate::retry::with_retry;
use crate::store::{DELETE_OPERATION, LIST_OPERATION, VersionStore};

#[derive(Debug, Clone)]
pub struct PrunerSettings {
    /// Log and count deletions without issuing them
    pub dry_run: bool,
    /// Bound applied to each listing and delete call
    pub request_timeout: Duration,
    /// Retry policy for delete calls; listing is never retried
    pub delete_retry: RetryConfig,
}

impl Default for PrunerSettings {
    fn default() -> Self {
        Self::from(&PrunerConfig::default())
    }
}

impl From<&PrunerConfig> for PrunerSettings {
    fn from(config: &PrunerConfig) -> Self {
        Self {
            dry_run: config.dry_run,
            request_timeout: config.request_timeout,
            delete_retry: config.delete_retry.clone(),
        }
    }
}

pub struct BucketPruner {
    store: Arc<dyn VersionStore>,
    settings: PrunerSettings,
}

impl BucketPruner {
    pub fn new(store: Arc<dyn VersionStore>, settings: PrunerSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &PrunerSettings {
        &self.settings
    }

    /// Prune one bucket. Never fails; every problem ends up in the report.
    pub async fn prune_bucket(&self, bucket: &str) -> PruneReport {
        let started = Instant::now();
        let mut report = PruneReport::new(bucket, self.settings.dry_run);

        tracing::info!(
            bucket = %bucket,
            dry_run = self.settings.dry_run,
            "Starting bucket cleanup"
        );

        let mut token: Option<ContinuationToken> = None;
        let mut hidden_key: Option<String> = None;
        loop {
            let page = match self.list_page(bucket, token.as_ref()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        bucket = %bucket,
                        page = report.pages_scanned + 1,
                        error = %e,
                        "Failed to list object versions, skipping rest of bucket"
                    );
                    report.listing_error = Some(e.to_string());
                    break;
                }
            };

            report.pages_scanned += 1;
            tracing::debug!(
                bucket = %bucket,
                page = report.pages_scanned,
                versions = page.versions().len(),
                delete_markers = page.delete_markers().len(),
                truncated = page.next.is_some(),
                "Listed object versions"
            );

            self.prune_page(bucket, &page, &mut hidden_key, &mut report)
                .await;

            match page.next {
                None => break,
                Some(next) if token.as_ref() == Some(&next) => {
                    let message = format!(
                        "listing cursor did not advance (key marker {:?}, version id marker {:?})",
                        next.key_marker, next.version_id_marker
                    );
                    tracing::error!(bucket = %bucket, "{message}");
                    report.listing_error = Some(message);
                    break;
                }
                Some(next) => token = Some(next),
            }
        }

        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        report
    }

    async fn list_page(
        &self,
        bucket: &str,
        token: Option<&ContinuationToken>,
    ) -> Result<ListingPage, StoreError> {
        let timeout = self.settings.request_timeout;
        tokio::time::timeout(timeout, self.store.list_object_versions(bucket, token))
            .await
            .map_err(|_| StoreError::Timeout {
                operation: LIST_OPERATION,
                timeout,
            })?
    }

    /// `hidden_key` is the last key seen with a current delete marker; its
    /// versions are non-current even when a later page reports them as latest.
    async fn prune_page(
        &self,
        bucket: &str,
        page: &ListingPage,
        hidden_key: &mut Option<String>,
        report: &mut PruneReport,
    ) {
        for version in page.versions() {
            if version.is_latest {
                if hidden_key.as_deref() != Some(version.key.as_str()) {
                    report.records_retained += 1;
                    continue;
                }
                tracing::debug!(
                    bucket = %bucket,
                    key = %version.key,
                    version_id = %version.version_id,
                    "Version surfaced by removed delete marker, treating as non-current"
                );
            }
            self.delete_record(
                bucket,
                RecordKind::Version,
                &version.key,
                &version.version_id,
                report,
            )
            .await;
        }

        for marker in page.delete_markers() {
            if marker.is_latest {
                *hidden_key = Some(marker.key.clone());
            }
            self.delete_record(
                bucket,
                RecordKind::DeleteMarker,
                &marker.key,
                &marker.version_id,
                report,
            )
            .await;
        }
    }

    async fn delete_record(
        &self,
        bucket: &str,
        kind: RecordKind,
        key: &str,
        version_id: &str,
        report: &mut PruneReport,
    ) {
        if self.settings.dry_run {
            tracing::info!(
                bucket = %bucket,
                key = %key,
                version_id = %version_id,
                kind = %kind,
                "[DRY-RUN] Would delete"
            );
            report.record_deleted(kind);
            return;
        }

        let store = self.store.as_ref();
        let timeout = self.settings.request_timeout;
        let result = with_retry(&self.settings.delete_retry, DELETE_OPERATION, move || async move {
            tokio::time::timeout(timeout, store.delete_object_version(bucket, key, version_id))
                .await
                .map_err(|_| StoreError::Timeout {
                    operation: DELETE_OPERATION,
                    timeout,
                })?
        })
        .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    bucket = %bucket,
                    key = %key,
                    version_id = %version_id,
                    kind = %kind,
                    "Deleted"
                );
                report.record_deleted(kind);
            }
            Err(e) => {
                tracing::warn!(
                    bucket = %bucket,
                    key = %key,
                    version_id = %version_id,
                    kind = %kind,
                    error = %e,
                    "Failed to delete"
                );
                report.failures.push(ItemFailure {
                    kind,
                    key: key.to_string(),
                    version_id: version_id.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}
