//! Per-bucket and per-run pruning results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{BucketId, RecordKind};

/// A version or delete marker that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub kind: RecordKind,
    pub key: String,
    pub version_id: String,
    pub error: String,
}

/// Outcome of pruning one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub bucket: BucketId,
    /// Non-current versions deleted (or that would be, in dry-run mode)
    pub versions_deleted: usize,
    /// Delete markers deleted (or that would be, in dry-run mode)
    pub markers_deleted: usize,
    /// Current versions left in place
    pub records_retained: usize,
    /// Listing pages consumed
    pub pages_scanned: usize,
    pub failures: Vec<ItemFailure>,
    /// Set when listing failed and the bucket was abandoned part-way
    pub listing_error: Option<String>,
    pub dry_run: bool,
    pub duration_ms: u64,
}

impl PruneReport {
    pub fn new(bucket: impl Into<BucketId>, dry_run: bool) -> Self {
        Self {
            bucket: bucket.into(),
            dry_run,
            ..Default::default()
        }
    }

    pub fn record_deleted(&mut self, kind: RecordKind) {
        match kind {
            RecordKind::Version => self.versions_deleted += 1,
            RecordKind::DeleteMarker => self.markers_deleted += 1,
        }
    }

    pub fn deleted_count(&self) -> usize {
        self.versions_deleted + self.markers_deleted
    }

    /// Item failures plus one for an abandoned listing.
    pub fn failure_count(&self) -> usize {
        self.failures.len() + usize::from(self.listing_error.is_some())
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn log(&self) {
        if let Some(error) = &self.listing_error {
            tracing::warn!(
                bucket = %self.bucket,
                versions_deleted = self.versions_deleted,
                markers_deleted = self.markers_deleted,
                failures = self.failure_count(),
                pages_scanned = self.pages_scanned,
                error = %error,
                "Bucket cleanup aborted by listing failure"
            );
        } else {
            tracing::info!(
                bucket = %self.bucket,
                versions_deleted = self.versions_deleted,
                markers_deleted = self.markers_deleted,
                retained = self.records_retained,
                failures = self.failure_count(),
                pages_scanned = self.pages_scanned,
                duration_ms = self.duration_ms,
                dry_run = self.dry_run,
                "Cleanup complete for bucket"
            );
        }
    }
}

/// Outcome of one full run across all configured buckets.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub dry_run: bool,
    pub reports: Vec<PruneReport>,
}

impl RunSummary {
    pub fn total_versions_deleted(&self) -> usize {
        self.reports.iter().map(|r| r.versions_deleted).sum()
    }

    pub fn total_markers_deleted(&self) -> usize {
        self.reports.iter().map(|r| r.markers_deleted).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.reports.iter().map(PruneReport::failure_count).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.total_failures() > 0
    }

    /// Whether the run counts as successful.
    ///
    /// Per-bucket and per-item failures only count against the run when
    /// `strict` is set.
    pub fn is_success(&self, strict: bool) -> bool {
        !(strict && self.has_failures())
    }

    /// Run totals only; bucket reports are logged as each bucket finishes.
    pub fn log(&self) {
        tracing::info!(
            run_id = %self.run_id,
            buckets = self.reports.len(),
            versions_deleted = self.total_versions_deleted(),
            markers_deleted = self.total_markers_deleted(),
            failures = self.total_failures(),
            dry_run = self.dry_run,
            duration_ms = (self.completed_at - self.started_at).num_milliseconds(),
            "Cleanup run completed"
        );
    }
}
