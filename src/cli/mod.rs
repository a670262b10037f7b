//! Command-line interface for keel.
//!
//! The CLI wires the provisioning engine together end to end: it loads the
//! configuration and template catalog, assembles the drivers over the system
//! process runner, and dispatches one of three commands.
//!
//! # Available Commands
//!
//! - `provision` - resolve a score descriptor, plan and apply the batch
//! - `teardown` - the delete path: plan with `-destroy`, then destroy
//! - `preview` - plan only; print the plan state and artifact path
//!
//! # Global Options
//!
//! All commands support:
//! - `--verbose` / `--quiet` - raise or suppress log output
//! - `--config` - custom configuration file path
//! - `--data-dir` - override the cache/project root directory
//!
//! # Example
//!
//! ```bash
//! # Provision everything the descriptor declares
//! keel provision --score ./score.yaml --catalog ./catalog.toml
//!
//! # Inspect the plan first
//! keel preview --score ./score.yaml --catalog ./catalog.toml
//!
//! # Tear the same batch down again
//! keel teardown --score ./score.yaml --catalog ./catalog.toml
//! ```
//!
//! Ctrl-C cancels the in-flight batch through the cancellation token; a
//! cancelled batch never proceeds to apply or destroy.

mod common;
mod preview;
mod provision;
mod teardown;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Top-level CLI parser: global flags plus one subcommand.
#[derive(Parser)]
#[command(
    name = "keel",
    about = "Score-driven provisioning for catalogued Terraform modules and Helm charts",
    version,
    author,
    long_about = "keel resolves a deployment's score descriptor against a template catalog, \
validates every resource against its module or chart source, and drives terraform through \
init, validate, plan and apply."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output.
    ///
    /// Shows debug-level logs from every pipeline stage, including the
    /// external commands being invoked. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    ///
    /// Intended for scripts and CI pipelines.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a custom configuration file.
    ///
    /// Overrides the default location (`~/.keel/config.toml`). The file
    /// configures the data directory and external tool names.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory for caches, projects and plan artifacts.
    ///
    /// Takes precedence over both the configuration file and the
    /// `KEEL_DATA_DIR` environment variable.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Plan and apply everything a score descriptor declares.
    Provision(provision::ProvisionCommand),

    /// Plan with -destroy and tear down the provisioned state.
    Teardown(teardown::TeardownCommand),

    /// Plan only; print the resulting state without applying.
    Preview(preview::PreviewCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// Initializes logging from the verbosity flags, loads configuration,
    /// and installs a Ctrl-C handler that cancels the in-flight batch
    /// through the shared cancellation token.
    ///
    /// # Errors
    ///
    /// Configuration, catalog and engine faults bubble up for
    /// [`crate::core::user_friendly_error`] to present.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        let config = common::load_config(self.config.as_deref(), self.data_dir.as_deref())?;

        let cancel = CancellationToken::new();
        let signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling in-flight work");
                signal.cancel();
            }
        });

        match self.command {
            Commands::Provision(cmd) => cmd.execute(config, cancel).await,
            Commands::Teardown(cmd) => cmd.execute(config, cancel).await,
            Commands::Preview(cmd) => cmd.execute(config, cancel).await,
        }
    }
}

/// Install the tracing subscriber according to the verbosity flags.
///
/// The default level is `info`, raised to `debug` by `--verbose` and cut to
/// `error` by `--quiet`; `RUST_LOG` is honored when neither flag is set.
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .try_init();
}
