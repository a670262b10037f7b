//! The `teardown` command: plan with `-destroy` and tear a batch down.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::cli::common;
use crate::config::Config;
use crate::score::{Application, Deployment};

/// Tear down everything a score descriptor declares.
///
/// Mirror image of `provision`: the same resolution and validation pipeline
/// runs, but the batch is planned with `-destroy` and then destroyed. Only
/// the Terraform partition participates; Helm inputs were never installed,
/// so nothing is torn down for them.
///
/// # Examples
///
/// ```bash
/// keel teardown --score ./score.yaml --catalog ./catalog.toml
/// ```
#[derive(Args)]
pub struct TeardownCommand {
    /// Path to the score descriptor file
    #[arg(long)]
    score: PathBuf,

    /// Path to the template catalog file
    #[arg(long)]
    catalog: PathBuf,

    /// Application name, used as descriptor resolution context
    #[arg(long, default_value = "local")]
    application: String,

    /// Commit identifier, used as descriptor resolution context
    #[arg(long, default_value = "local")]
    commit: String,
}

impl TeardownCommand {
    /// Execute the teardown command.
    pub async fn execute(self, config: Config, cancel: CancellationToken) -> Result<()> {
        let provisioner = common::build_provisioner(&config, &self.score, &self.catalog)?;
        let application = Application::new(self.application);
        let deployment = Deployment::new(self.commit);
        provisioner.teardown(&application, &deployment, &cancel).await
    }
}
