use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Global CLI arguments
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Subcommands that only inspect the configuration and exit
#[derive(Subcommand, Debug, Clone)]
pub enum CommonCommands {
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::{Configuration, ParameterSourceKind};
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Pick the log filter from the CLI flags, falling back to `RUST_LOG`.
    pub fn log_filter(args: &CommonArgs) -> EnvFilter {
        if args.quiet {
            EnvFilter::new("warn")
        } else if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        }
    }

    /// Initialize logging based on CLI arguments
    pub fn init_logging(args: &CommonArgs) {
        // a subscriber may already be installed by the embedding process
        let _ = tracing_subscriber::fmt()
            .with_env_filter(log_filter(args))
            .with_target(false)
            .try_init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Render configuration in human-readable or JSON format
    pub fn render_config(config: &Configuration, json: bool) -> Result<String> {
        if json {
            return serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON");
        }

        let mut out = String::new();
        out.push_str("bucketsweep configuration\n");
        out.push_str("=========================\n");
        out.push_str(&format!("Parameter key: {}\n", config.parameters.key));
        let source = match config.parameters.source {
            ParameterSourceKind::Ssm => "ssm",
            ParameterSourceKind::Inline => "inline",
        };
        out.push_str(&format!("Parameter source: {source}\n"));
        out.push_str(&format!(
            "AWS region: {}\n",
            config.aws.region.as_deref().unwrap_or("<sdk default>")
        ));
        if let Some(endpoint) = &config.aws.endpoint_url {
            out.push_str(&format!("AWS endpoint: {endpoint}\n"));
        }
        out.push_str(&format!("Dry run: {}\n", config.pruner.dry_run));
        out.push_str(&format!("Strict: {}\n", config.pruner.strict));
        out.push_str(&format!("Page size: {}\n", config.pruner.page_size));
        out.push_str(&format!(
            "Request timeout: {:?}\n",
            config.pruner.request_timeout
        ));
        out.push_str(&format!(
            "Delete attempts: {}\n",
            config.pruner.delete_retry.max_attempts
        ));
        Ok(out)
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        tracing::info!("Validating configuration...");
        config.validate().context("Invalid configuration")?;
        tracing::info!("Configuration validation passed");
        Ok(())
    }

    /// Execute one of the configuration-only commands
    ///
    /// `version` is the caller's version line, so the binary reports its own
    /// package rather than this library's.
    pub fn handle_common_command(
        command: &CommonCommands,
        config: &Configuration,
        version: &str,
    ) -> Result<()> {
        match command {
            CommonCommands::Config { json } => {
                print!("{}", render_config(config, *json)?);
                if *json {
                    println!();
                }
            }
            CommonCommands::Validate => validate_config(config)?,
            CommonCommands::Version => println!("{version}"),
        }
        Ok(())
    }

    /// Standard version line: `<name> <version> (rust <msrv>)`
    pub fn version_info(name: &str, version: &str, rust_version: &str) -> String {
        format!("{name} {version} (rust {rust_version})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    #[test]
    fn test_version_info() {
        let version = utils::version_info("bucketsweep", "0.1.0", "1.85.0");
        assert_eq!(version, "bucketsweep 0.1.0 (rust 1.85.0)");
    }

    #[test]
    fn test_render_config_text() {
        let config = Configuration::default();
        let text = utils::render_config(&config, false).unwrap();
        assert!(text.contains("Parameter key: /my/s3/bucket-list"));
        assert!(text.contains("Parameter source: ssm"));
        assert!(text.contains("AWS region: <sdk default>"));
    }

    #[test]
    fn test_render_config_json_roundtrips_key() {
        let config = Configuration::default();
        let json = utils::render_config(&config, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["parameters"]["key"], "/my/s3/bucket-list");
        assert_eq!(value["pruner"]["request_timeout"], "30s");
    }

    #[test]
    fn test_validate_config_propagates_errors() {
        let mut config = Configuration::default();
        config.pruner.page_size = 0;
        assert!(utils::validate_config(&config).is_err());
    }
}
