//! The `provision` command: plan then apply a score descriptor's batch.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::cli::common;
use crate::config::Config;
use crate::score::{Application, Deployment};

/// Provision everything a score descriptor declares.
///
/// Resolves each declared resource against the catalog, validates the batch
/// concurrently, renders the provisioning project, then plans and applies
/// it. Resources that cannot be resolved are logged and skipped without
/// aborting their siblings.
///
/// # Examples
///
/// ```bash
/// keel provision --score ./score.yaml --catalog ./catalog.toml
/// keel --verbose provision --score ./score.yaml --catalog ./catalog.toml
/// ```
#[derive(Args)]
pub struct ProvisionCommand {
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

impl ProvisionCommand {
    /// Execute the provision command.
    pub async fn execute(self, config: Config, cancel: CancellationToken) -> Result<()> {
        let provisioner = common::build_provisioner(&config, &self.score, &self.catalog)?;
        let application = Application::new(self.application);
        let deployment = Deployment::new(self.commit);
        provisioner.start(&application, &deployment, &cancel).await
    }
}
