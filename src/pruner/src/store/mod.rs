//! Version store port.
//!
//! The pruner only needs two calls from object storage: a paginated version
//! listing and a delete addressed by (key, version id). Keeping them behind a
//! trait lets tests drive the pruner with an in-memory bucket.

pub mod s3;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{ContinuationToken, ListingPage};

pub use s3::S3VersionStore;

pub const LIST_OPERATION: &str = "list_object_versions";
pub const DELETE_OPERATION: &str = "delete_object";

#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Fetch one page of versions and delete markers.
    ///
    /// `token` is `None` for the first page and the previous page's `next`
    /// afterwards.
    async fn list_object_versions(
        &self,
        bucket: &str,
        token: Option<&ContinuationToken>,
    ) -> Result<ListingPage, StoreError>;

    /// Permanently delete exactly one version or delete marker.
    async fn delete_object_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> Result<(), StoreError>;
}
