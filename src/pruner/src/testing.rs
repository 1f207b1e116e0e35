//! In-memory versioned bucket for tests.
//!
//! Mimics the parts of S3 versioning the pruner depends on: the newest record
//! of each key is current, listings come back ordered by key then newest
//! first, and pages resume after a (key, version id) cursor. Listing and
//! deletion failures can be injected per bucket or per version.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{ContinuationToken, DeleteMarker, ListingPage, ObjectVersion, RecordKind};
use crate::store::{DELETE_OPERATION, LIST_OPERATION, VersionStore};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Snapshot of one record as a listing would report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: String,
    pub version_id: String,
    pub kind: RecordKind,
    pub is_latest: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    version_id: String,
    kind: RecordKind,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, Vec<Entry>>,
    next_seq: u64,
    /// Sequence numbers of every version id ever issued, so a cursor still
    /// resolves after its record was deleted.
    issued: HashMap<(String, String, String), u64>,
    failing_listings: HashSet<String>,
    listing_page_limit: HashMap<String, usize>,
    pages_served: HashMap<String, usize>,
    failing_deletes: HashSet<(String, String)>,
    transient_deletes: HashMap<(String, String), u32>,
    repeat_cursor: HashSet<String>,
    latency: Option<Duration>,
    list_calls: Vec<(String, Option<ContinuationToken>)>,
    delete_calls: Vec<(String, String, String)>,
}

impl State {
    fn insert(&mut self, bucket: &str, key: &str, version_id: &str, kind: RecordKind) {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.issued.insert(
            (bucket.to_string(), key.to_string(), version_id.to_string()),
            seq,
        );
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .push(Entry {
                key: key.to_string(),
                version_id: version_id.to_string(),
                kind,
                seq,
            });
    }

    /// Entries in listing order with their current flag.
    fn listing(&self, bucket: &str) -> Option<Vec<(Entry, bool)>> {
        let entries = self.buckets.get(bucket)?;

        let mut newest: HashMap<&str, u64> = HashMap::new();
        for entry in entries {
            let seq = newest.entry(entry.key.as_str()).or_insert(entry.seq);
            *seq = (*seq).max(entry.seq);
        }

        let mut listed: Vec<(Entry, bool)> = entries
            .iter()
            .map(|e| (e.clone(), newest.get(e.key.as_str()) == Some(&e.seq)))
            .collect();
        listed.sort_by(|(a, _), (b, _)| (&a.key, Reverse(a.seq)).cmp(&(&b.key, Reverse(b.seq))));
        Some(listed)
    }
}

#[derive(Debug)]
pub struct InMemoryVersionStore {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for InMemoryVersionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Records per listing page, counting versions and markers together.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.lock().buckets.entry(bucket.to_string()).or_default();
    }

    /// Add a version with an explicit id; it becomes current for its key.
    pub fn insert_version(&self, bucket: &str, key: &str, version_id: &str) {
        self.lock()
            .insert(bucket, key, version_id, RecordKind::Version);
    }

    /// Add a delete marker with an explicit id; it becomes current for its key.
    pub fn insert_delete_marker(&self, bucket: &str, key: &str, version_id: &str) {
        self.lock()
            .insert(bucket, key, version_id, RecordKind::DeleteMarker);
    }

    /// Write a new version and return its generated id.
    pub fn put_object(&self, bucket: &str, key: &str) -> String {
        let mut state = self.lock();
        let version_id = format!("v{:06}", state.next_seq + 1);
        state.insert(bucket, key, &version_id, RecordKind::Version);
        version_id
    }

    /// Unversioned delete: place a delete marker and return its id.
    pub fn delete_object(&self, bucket: &str, key: &str) -> String {
        let mut state = self.lock();
        let version_id = format!("dm{:06}", state.next_seq + 1);
        state.insert(bucket, key, &version_id, RecordKind::DeleteMarker);
        version_id
    }

    /// Every listing of `bucket` fails.
    pub fn fail_listing(&self, bucket: &str) {
        self.lock().failing_listings.insert(bucket.to_string());
    }

    /// Listing of `bucket` fails once `pages` pages have been served.
    pub fn fail_listing_after(&self, bucket: &str, pages: usize) {
        self.lock()
            .listing_page_limit
            .insert(bucket.to_string(), pages);
    }

    /// Deleting this version always fails.
    pub fn fail_delete(&self, bucket: &str, version_id: &str) {
        self.lock()
            .failing_deletes
            .insert((bucket.to_string(), version_id.to_string()));
    }

    /// Deleting this version fails `times` times, then succeeds.
    pub fn fail_delete_times(&self, bucket: &str, version_id: &str, times: u32) {
        self.lock()
            .transient_deletes
            .insert((bucket.to_string(), version_id.to_string()), times);
    }

    /// Hand back the caller's own cursor instead of advancing.
    pub fn repeat_cursor(&self, bucket: &str) {
        self.lock().repeat_cursor.insert(bucket.to_string());
    }

    /// Delay applied to every call.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Current contents of `bucket` in listing order.
    pub fn records(&self, bucket: &str) -> Vec<StoredRecord> {
        self.lock()
            .listing(bucket)
            .unwrap_or_default()
            .into_iter()
            .map(|(entry, is_latest)| StoredRecord {
                key: entry.key,
                version_id: entry.version_id,
                kind: entry.kind,
                is_latest,
            })
            .collect()
    }

    /// (bucket, cursor) of every listing request, in order.
    pub fn list_calls(&self) -> Vec<(String, Option<ContinuationToken>)> {
        self.lock().list_calls.clone()
    }

    /// (bucket, key, version id) of every delete request, in order.
    pub fn delete_calls(&self) -> Vec<(String, String, String)> {
        self.lock().delete_calls.clone()
    }

    fn latency(&self) -> Option<Duration> {
        self.lock().latency
    }

    fn list_now(
        &self,
        bucket: &str,
        token: Option<&ContinuationToken>,
    ) -> Result<ListingPage, StoreError> {
        let mut state = self.lock();
        state
            .list_calls
            .push((bucket.to_string(), token.cloned()));

        if state.failing_listings.contains(bucket) {
            return Err(StoreError::request(
                LIST_OPERATION,
                format!("AccessDenied: listing {bucket} is not allowed"),
            ));
        }

        let served = state.pages_served.get(bucket).copied().unwrap_or(0);
        if let Some(limit) = state.listing_page_limit.get(bucket) {
            if served >= *limit {
                return Err(StoreError::request(
                    LIST_OPERATION,
                    format!("InternalError: listing {bucket} failed after {served} pages"),
                ));
            }
        }

        let Some(listing) = state.listing(bucket) else {
            return Err(StoreError::request(
                LIST_OPERATION,
                format!("NoSuchBucket: {bucket}"),
            ));
        };

        // resume strictly after the cursor position
        let cursor = token.and_then(|t| {
            let key = t.key_marker.clone()?;
            let seq = t.version_id_marker.as_ref().and_then(|vid| {
                state
                    .issued
                    .get(&(bucket.to_string(), key.clone(), vid.clone()))
                    .copied()
            });
            Some((key, seq))
        });
        let remaining: Vec<(Entry, bool)> = listing
            .into_iter()
            .filter(|(e, _)| match &cursor {
                None => true,
                Some((key, None)) => e.key.as_str() > key.as_str(),
                Some((key, Some(seq))) => (&e.key, Reverse(e.seq)) > (key, Reverse(*seq)),
            })
            .collect();

        let truncated = remaining.len() > self.page_size;
        let page: Vec<(Entry, bool)> = remaining.into_iter().take(self.page_size).collect();

        let mut next = if truncated {
            page.last().map(|(e, _)| ContinuationToken {
                key_marker: Some(e.key.clone()),
                version_id_marker: Some(e.version_id.clone()),
            })
        } else {
            None
        };
        if state.repeat_cursor.contains(bucket) && token.is_some() {
            next = token.cloned();
        }

        let mut versions = Vec::new();
        let mut delete_markers = Vec::new();
        for (entry, is_latest) in page {
            match entry.kind {
                RecordKind::Version => versions.push(ObjectVersion {
                    key: entry.key,
                    version_id: entry.version_id,
                    is_latest,
                }),
                RecordKind::DeleteMarker => delete_markers.push(DeleteMarker {
                    key: entry.key,
                    version_id: entry.version_id,
                    is_latest,
                }),
            }
        }

        *state.pages_served.entry(bucket.to_string()).or_default() += 1;

        // absent collections are omitted, as in the S3 response
        Ok(ListingPage {
            versions: (!versions.is_empty()).then_some(versions),
            delete_markers: (!delete_markers.is_empty()).then_some(delete_markers),
            next,
        })
    }

    fn delete_now(&self, bucket: &str, key: &str, version_id: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        state
            .delete_calls
            .push((bucket.to_string(), key.to_string(), version_id.to_string()));

        let id = (bucket.to_string(), version_id.to_string());
        if state.failing_deletes.contains(&id) {
            return Err(StoreError::request(
                DELETE_OPERATION,
                format!("AccessDenied: cannot delete {key} ({version_id})"),
            ));
        }
        if let Some(remaining) = state.transient_deletes.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::request(
                    DELETE_OPERATION,
                    "SlowDown: please reduce your request rate",
                ));
            }
        }

        let Some(entries) = state.buckets.get_mut(bucket) else {
            return Err(StoreError::request(
                DELETE_OPERATION,
                format!("NoSuchBucket: {bucket}"),
            ));
        };
        entries.retain(|e| !(e.key == key && e.version_id == version_id));
        Ok(())
    }
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn list_object_versions(
        &self,
        bucket: &str,
        token: Option<&ContinuationToken>,
    ) -> Result<ListingPage, StoreError> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }
        self.list_now(bucket, token)
    }

    async fn delete_object_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> Result<(), StoreError> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }
        self.delete_now(bucket, key, version_id)
    }
}
