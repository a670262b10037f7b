//! Shared assembly for the CLI commands.
//!
//! Every command builds the same engine: system process runner, source
//! fetcher, terraform driver, helm validator, factory, and a provisioner fed
//! by the file-based score source and catalog. Commands differ only in which
//! provisioner entry point they call.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::catalog::FileCatalog;
use crate::config::Config;
use crate::git::SourceFetcher;
use crate::helm::HelmValidator;
use crate::process::{CommandRunner, SystemRunner, ensure_tool};
use crate::provision::{ResourceFactory, ResourceProvisioner};
use crate::score::FileScoreSource;
use crate::terraform::{TerraformDriver, TerraformTool};

/// Load configuration, honoring the global `--config` and `--data-dir` flags.
pub(crate) fn load_config(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    Ok(config)
}

/// Verify every external tool keel drives is resolvable in PATH.
///
/// Running this up front keeps a missing tool from surfacing halfway through
/// a batch as a validation rejection.
pub(crate) fn preflight_tools(config: &Config) -> Result<()> {
    ensure_tool(&config.tools.git)?;
    ensure_tool(&config.tools.terraform)?;
    ensure_tool(&config.tools.inspect)?;
    Ok(())
}

/// Assemble the provisioning engine over the system process runner.
///
/// The catalog is loaded before the tool preflight so a malformed input file
/// fails fast regardless of the local tool installation.
pub(crate) fn build_provisioner(
    config: &Config,
    score: &Path,
    catalog: &Path,
) -> Result<ResourceProvisioner> {
    let catalog = FileCatalog::load(catalog)?;
    preflight_tools(config)?;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let fetcher = Arc::new(SourceFetcher::new(runner.clone(), config.tools.git.clone()));
    let tool = Arc::new(TerraformTool::new(
        runner,
        config.tools.terraform.clone(),
        config.tools.inspect.clone(),
    ));
    let terraform = TerraformDriver::new(fetcher.clone(), tool, config.clone());
    let helm = HelmValidator::new(fetcher, config.clone());
    let factory = ResourceFactory::new(terraform, helm);

    Ok(ResourceProvisioner::new(
        Arc::new(FileScoreSource::new(score)),
        Arc::new(catalog),
        factory,
    ))
}
