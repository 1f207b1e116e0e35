//! Listing records and pagination cursor.

use std::fmt;

use serde::Serialize;

/// Opaque bucket name, fixed for the duration of a run.
pub type BucketId = String;

/// One stored version of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
}

/// Tombstone left by an unversioned delete. May itself be the current record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMarker {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
}

/// Cursor for the next listing page.
///
/// Version listings page on a (key, version id) position rather than a
/// single token, so both halves are carried.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

/// One page of a version listing.
///
/// Either collection may be absent from the underlying response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub versions: Option<Vec<ObjectVersion>>,
    pub delete_markers: Option<Vec<DeleteMarker>>,
    pub next: Option<ContinuationToken>,
}

impl ListingPage {
    pub fn versions(&self) -> &[ObjectVersion] {
        self.versions.as_deref().unwrap_or(&[])
    }

    pub fn delete_markers(&self) -> &[DeleteMarker] {
        self.delete_markers.as_deref().unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.versions().len() + self.delete_markers().len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Version,
    DeleteMarker,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Version => write!(f, "version"),
            RecordKind::DeleteMarker => write!(f, "delete_marker"),
        }
    }
}
