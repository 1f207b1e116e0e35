//! Configuration file and environment flowing into bucket list resolution.

use common::cli::utils;
use figment::Jail;
use pruner::{ConfigError, Runner};

fn resolve_in_jail() -> Result<Vec<String>, ConfigError> {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let config = utils::load_config(None).unwrap();
        let runner = Runner::from_configuration(&config).await.unwrap();
        runner.resolve().await
    })
}

#[test]
fn inline_parameters_from_config_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "bucketsweep.toml",
            r#"
            [parameters]
            key = "/ops/buckets"
            source = "inline"

            [parameters.values]
            "/ops/buckets" = "logs, archive ,backups"

            [aws]
            region = "eu-west-1"
            "#,
        )?;

        let buckets = resolve_in_jail().unwrap();
        assert_eq!(buckets, vec!["logs", "archive", "backups"]);
        Ok(())
    });
}

#[test]
fn environment_overrides_parameter_key() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "bucketsweep.toml",
            r#"
            [parameters]
            source = "inline"

            [parameters.values]
            "/my/s3/bucket-list" = "default-bucket"
            "/other/list" = "other-bucket"

            [aws]
            region = "us-east-1"
            "#,
        )?;
        jail.set_env("BUCKETSWEEP__PARAMETERS__KEY", "/other/list");

        let buckets = resolve_in_jail().unwrap();
        assert_eq!(buckets, vec!["other-bucket"]);
        Ok(())
    });
}

#[test]
fn unknown_inline_key_is_not_found() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "bucketsweep.toml",
            r#"
            [parameters]
            key = "/missing"
            source = "inline"

            [aws]
            region = "us-east-1"
            "#,
        )?;

        let err = resolve_in_jail().unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { key } if key == "/missing"));
        Ok(())
    });
}
