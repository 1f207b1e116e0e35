//! Orchestrator: resolve the bucket list once, then prune bucket by bucket.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use common::aws::load_sdk_config;
use common::config::{Configuration, ParameterSourceKind};

use crate::error::{ConfigError, RunError};
use crate::model::BucketId;
use crate::parameters::{
    InlineParameterSource, ParameterSource, SsmParameterSource, resolve_bucket_list,
};
use crate::pruner::{BucketPruner, PrunerSettings};
use crate::report::RunSummary;
use crate::store::S3VersionStore;

pub struct Runner {
    parameters: Arc<dyn ParameterSource>,
    parameter_key: String,
    pruner: BucketPruner,
}

impl Runner {
    pub fn new(
        parameters: Arc<dyn ParameterSource>,
        parameter_key: impl Into<String>,
        pruner: BucketPruner,
    ) -> Self {
        Self {
            parameters,
            parameter_key: parameter_key.into(),
            pruner,
        }
    }

    /// Wire AWS-backed clients from configuration.
    pub async fn from_configuration(config: &Configuration) -> anyhow::Result<Self> {
        config.validate().context("Invalid configuration")?;

        let sdk_config = load_sdk_config(&config.aws).await;

        let parameters: Arc<dyn ParameterSource> = match config.parameters.source {
            ParameterSourceKind::Ssm => Arc::new(SsmParameterSource::from_sdk_config(&sdk_config)),
            ParameterSourceKind::Inline => Arc::new(InlineParameterSource::new(
                config.parameters.values.clone(),
            )),
        };

        let store = Arc::new(S3VersionStore::from_sdk_config(
            &sdk_config,
            config.aws.force_path_style,
            config.pruner.page_size,
        ));

        Ok(Self::new(
            parameters,
            config.parameters.key.clone(),
            BucketPruner::new(store, PrunerSettings::from(&config.pruner)),
        ))
    }

    pub fn parameter_key(&self) -> &str {
        &self.parameter_key
    }

    pub async fn resolve(&self) -> Result<Vec<BucketId>, ConfigError> {
        resolve_bucket_list(self.parameters.as_ref(), &self.parameter_key).await
    }

    /// Prune every configured bucket in order.
    ///
    /// Only a configuration failure aborts the run. Listing and deletion
    /// failures are recorded in the bucket's report and the run moves on.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let dry_run = self.pruner.settings().dry_run;

        tracing::info!(
            run_id = %run_id,
            parameter_key = %self.parameter_key,
            dry_run,
            "Starting cleanup run"
        );

        let buckets = self.resolve().await.inspect_err(|e| {
            tracing::error!(
                run_id = %run_id,
                parameter_key = %self.parameter_key,
                error = %e,
                "Failed to resolve bucket list"
            );
        })?;

        let mut reports = Vec::with_capacity(buckets.len());
        for bucket in &buckets {
            let report = self.pruner.prune_bucket(bucket).await;
            report.log();
            reports.push(report);
        }

        Ok(RunSummary {
            run_id,
            started_at,
            completed_at: Utc::now(),
            dry_run,
            reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::MockParameterSource;
    use crate::testing::InMemoryVersionStore;

    const KEY: &str = "/my/s3/bucket-list";

    fn runner_with(value: &str, store: Arc<InMemoryVersionStore>) -> Runner {
        let parameters = Arc::new(InlineParameterSource::from_pairs([(KEY, value)]));
        Runner::new(
            parameters,
            KEY,
            BucketPruner::new(store, PrunerSettings::default()),
        )
    }

    #[tokio::test]
    async fn test_one_report_per_bucket_in_order() {
        let store = Arc::new(InMemoryVersionStore::new());
        store.create_bucket("a");
        store.create_bucket("b");

        let summary = runner_with("b, a", store).run().await.unwrap();

        let buckets: Vec<_> = summary.reports.iter().map(|r| r.bucket.as_str()).collect();
        assert_eq!(buckets, vec!["b", "a"]);
        assert!(summary.completed_at >= summary.started_at);
        assert!(!summary.run_id.is_empty());
    }

    #[tokio::test]
    async fn test_missing_parameter_is_fatal() {
        let store = Arc::new(InMemoryVersionStore::new());
        let parameters = Arc::new(InlineParameterSource::default());
        let runner = Runner::new(
            parameters,
            KEY,
            BucketPruner::new(store.clone(), PrunerSettings::default()),
        );

        let err = runner.run().await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Configuration(ConfigError::NotFound { .. })
        ));
        assert!(store.list_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let mut parameters = MockParameterSource::new();
        parameters.expect_get_parameter().times(1).returning(|key| {
            Err(ConfigError::Unavailable {
                key: key.to_string(),
                message: "dispatch failure".to_string(),
            })
        });

        let store = Arc::new(InMemoryVersionStore::new());
        let runner = Runner::new(
            Arc::new(parameters),
            KEY,
            BucketPruner::new(store, PrunerSettings::default()),
        );

        let err = runner.run().await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Configuration(ConfigError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_from_configuration_rejects_invalid_config() {
        let mut config = Configuration::default();
        config.pruner.page_size = 0;
        assert!(Runner::from_configuration(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_from_configuration_with_inline_parameters() {
        let mut config = Configuration::default();
        config.parameters.source = ParameterSourceKind::Inline;
        config
            .parameters
            .values
            .insert(KEY.to_string(), "logs,archive".to_string());
        config.aws.region = Some("us-east-1".to_string());

        let runner = Runner::from_configuration(&config).await.unwrap();
        assert_eq!(runner.parameter_key(), KEY);
        assert_eq!(runner.resolve().await.unwrap(), vec!["logs", "archive"]);
    }
}
