use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "bucketsweep.toml";

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "BUCKETSWEEP__";

/// Largest page the S3 `ListObjectVersions` API will return.
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Where the bucket list parameter is read from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParameterSourceKind {
    /// AWS Systems Manager Parameter Store
    #[default]
    Ssm,
    /// Values embedded in the configuration itself (`parameters.values`)
    Inline,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParametersConfig {
    /// Key of the parameter holding the comma-separated bucket list
    pub key: String,
    pub source: ParameterSourceKind,
    /// Inline parameter values, only consulted when `source = "inline"`
    #[serde(default)]
    pub values: HashMap<String, String>,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            key: String::from("/my/s3/bucket-list"),
            source: ParameterSourceKind::Ssm,
            values: HashMap::new(),
        }
    }
}

/// Overrides for the AWS SDK client configuration.
///
/// Everything is optional; unset fields fall back to the SDK default
/// provider chain (environment, profile, instance metadata).
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AwsConfig {
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores such as MinIO
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    /// Never written back out by `config --json`
    #[serde(default, skip_serializing)]
    pub secret_access_key: Option<String>,
}

/// Bounded retry applied to individual delete calls.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one; 1 disables retrying
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrunerConfig {
    /// Log what would be deleted without deleting anything
    pub dry_run: bool,
    /// Exit non-zero when any bucket or item failed
    pub strict: bool,
    /// Records requested per listing page
    pub page_size: i32,
    /// Upper bound for every single listing or delete call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub delete_retry: RetryConfig,
}

impl Default for PrunerConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            strict: false,
            page_size: MAX_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
            delete_retry: RetryConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Bucket list parameter lookup
    pub parameters: ParametersConfig,
    /// AWS client overrides
    pub aws: AwsConfig,
    /// Pruning behaviour
    pub pruner: PrunerConfig,
}

impl Configuration {
    /// Load defaults, `bucketsweep.toml` from the working directory and
    /// `BUCKETSWEEP__` environment overrides, in that order.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(DEFAULT_CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    /// Same as [`Configuration::load`] but reads the TOML file from `path`.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(path)).extract().map_err(Box::new)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject values the pruner cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.parameters.key.trim().is_empty() {
            anyhow::bail!("parameters.key cannot be empty");
        }

        if self.parameters.source == ParameterSourceKind::Inline
            && !self.parameters.values.contains_key(&self.parameters.key)
        {
            tracing::warn!(
                key = %self.parameters.key,
                "Inline parameter source has no value for the configured key"
            );
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.pruner.page_size) {
            anyhow::bail!(
                "pruner.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.pruner.page_size
            );
        }

        if self.pruner.request_timeout.is_zero() {
            anyhow::bail!("pruner.request_timeout must be positive");
        }

        let retry = &self.pruner.delete_retry;
        if retry.max_attempts == 0 {
            anyhow::bail!("pruner.delete_retry.max_attempts must be at least 1");
        }
        if retry.backoff_multiplier < 1.0 {
            anyhow::bail!(
                "pruner.delete_retry.backoff_multiplier must be >= 1.0, got {}",
                retry.backoff_multiplier
            );
        }

        if self.aws.access_key_id.is_some() != self.aws.secret_access_key.is_some() {
            anyhow::bail!("aws.access_key_id and aws.secret_access_key must be set together");
        }

        Ok(())
    }
}
