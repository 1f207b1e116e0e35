//! Version pruning for versioned object storage buckets.
//!
//! Removes every non-current object version and every delete marker from a
//! configured set of buckets, keeping only the current version of each key.
//!
//! ## Architecture
//!
//! - `parameters`: resolves the bucket list from a key/value configuration store
//! - `store`: the listing/deletion port and its S3 adapter
//! - `pruner`: per-bucket traversal and deletion
//! - `runner`: resolves once, prunes every bucket in order
//! - `report`: per-bucket and per-run results
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use pruner::{BucketPruner, PrunerSettings, Runner};
//! use pruner::parameters::InlineParameterSource;
//! use pruner::store::S3VersionStore;
//!
//! # async fn example(sdk_config: aws_config::SdkConfig) -> anyhow::Result<()> {
//! let store = Arc::new(S3VersionStore::from_sdk_config(&sdk_config, false, 1000));
//! let parameters = Arc::new(InlineParameterSource::from_pairs([(
//!     "/my/s3/bucket-list",
//!     "logs,archive",
//! )]));
//!
//! let runner = Runner::new(
//!     parameters,
//!     "/my/s3/bucket-list",
//!     BucketPruner::new(store, PrunerSettings::default()),
//! );
//! let summary = runner.run().await?;
//! summary.log();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod model;
pub mod parameters;
pub mod pruner;
pub mod report;
pub mod retry;
pub mod runner;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ConfigError, RunError, StoreError};
pub use model::{BucketId, ContinuationToken, DeleteMarker, ListingPage, ObjectVersion, RecordKind};
pub use parameters::{ParameterSource, parse_bucket_list, resolve_bucket_list};
pub use pruner::{BucketPruner, PrunerSettings};
pub use report::{ItemFailure, PruneReport, RunSummary};
pub use runner::Runner;
pub use store::VersionStore;
