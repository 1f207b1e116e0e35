//! bucketsweep
//!
//! Removes non-current object versions and delete markers from the versioned
//! buckets listed in a configuration parameter.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use common::config::Configuration;
use pruner::Runner;

/// Configuration could not be loaded or the bucket list could not be resolved.
const EXIT_FATAL: u8 = 1;
/// Strict mode and at least one bucket or item failed.
const EXIT_FAILURES: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Prune every configured bucket (default)
    Run(RunArgs),
    /// Print the resolved bucket list and exit
    Resolve {
        #[arg(long, help = "Print the bucket list as a JSON array")]
        json: bool,
    },
    #[command(flatten)]
    Common(CommonCommands),
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    #[arg(long, help = "Log what would be deleted without deleting anything")]
    dry_run: bool,

    #[arg(long, help = "Exit non-zero if any bucket or item failed")]
    strict: bool,

    #[arg(long, help = "Print the run summary as JSON")]
    json: bool,

    #[arg(long, value_name = "KEY", help = "Override the bucket list parameter key")]
    parameter_key: Option<String>,
}

impl RunArgs {
    /// CLI flags only ever switch behaviour on; they never turn off a
    /// setting enabled in the configuration file.
    fn apply(&self, config: &mut Configuration) {
        if self.dry_run {
            config.pruner.dry_run = true;
        }
        if self.strict {
            config.pruner.strict = true;
        }
        if let Some(key) = &self.parameter_key {
            config.parameters.key = key.clone();
        }
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        tracing::info!("Received Ctrl+C");
    }

    Ok(())
}

async fn run(mut config: Configuration, args: RunArgs) -> Result<ExitCode> {
    args.apply(&mut config);
    let strict = config.pruner.strict;

    let runner = Runner::from_configuration(&config).await?;

    let summary = tokio::select! {
        result = runner.run() => result.context("Cleanup run failed")?,
        signal = wait_for_shutdown_signal() => {
            signal?;
            // deletions already issued stay done
            anyhow::bail!("Cleanup run interrupted");
        }
    };

    summary.log();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?
        );
    }

    if summary.is_success(strict) {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(
            failures = summary.total_failures(),
            "Run finished with failures in strict mode"
        );
        Ok(ExitCode::from(EXIT_FAILURES))
    }
}

async fn resolve(config: Configuration, json: bool) -> Result<ExitCode> {
    let runner = Runner::from_configuration(&config).await?;
    let buckets = runner
        .resolve()
        .await
        .with_context(|| format!("Failed to resolve {}", runner.parameter_key()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string(&buckets).context("Failed to serialize bucket list")?
        );
    } else {
        for bucket in buckets {
            println!("{bucket}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let config = utils::load_config(cli.common.config.as_ref())?;

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run(config, args).await,
        Command::Resolve { json } => resolve(config, json).await,
        Command::Common(command) => {
            let version = utils::version_info(
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_RUST_VERSION"),
            );
            utils::handle_common_command(&command, &config, &version)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    utils::init_logging(&cli.common);

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            ExitCode::from(EXIT_FATAL)
        }
    }
}
