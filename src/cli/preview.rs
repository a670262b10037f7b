//! The `preview` command: plan without applying.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::cli::common;
use crate::config::Config;
use crate::score::{Application, Deployment};

/// Plan a score descriptor's batch and report the outcome without applying.
///
/// Runs the full resolution, validation and plan pipeline, then prints the
/// resulting plan state and artifact path. Nothing is ever applied or
/// destroyed; rerun with `provision` or `teardown` to execute the plan's
/// project.
///
/// # Examples
///
/// ```bash
/// keel preview --score ./score.yaml --catalog ./catalog.toml
/// keel preview --score ./score.yaml --catalog ./catalog.toml --destroy
/// ```
#[derive(Args)]
pub struct PreviewCommand {
    /// Path to the score descriptor file
    #[arg(long)]
    score: PathBuf,

    /// Path to the template catalog file
    #[arg(long)]
    catalog: PathBuf,

    /// Plan the batch for destruction instead of creation
    #[arg(long)]
    destroy: bool,

    /// Application name, used as descriptor resolution context
    #[arg(long, default_value = "local")]
    application: String,

    /// Commit identifier, used as descriptor resolution context
    #[arg(long, default_value = "local")]
    commit: String,
}

impl PreviewCommand {
    /// Execute the preview command.
    pub async fn execute(self, config: Config, cancel: CancellationToken) -> Result<()> {
        let provisioner = common::build_provisioner(&config, &self.score, &self.catalog)?;
        let application = Application::new(self.application);
        let deployment = Deployment::new(self.commit);

        let outcome =
            provisioner.preview(&application, &deployment, self.destroy, &cancel).await?;

        match outcome {
            Some(outcome) => {
                println!("{} {}", "Plan state:".bold(), outcome.state_name());
                if let Some(plan_file) = outcome.plan_file() {
                    println!("{} {}", "Plan artifact:".bold(), plan_file.display());
                }
            }
            None => println!("No terraform inputs to plan."),
        }

        Ok(())
    }
}
