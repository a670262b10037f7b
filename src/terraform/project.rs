//! Materializes a provisioning project on disk.
//!
//! A project is one state directory named after the provisioning batch,
//! holding the rendered `main.tf` and `providers.tf` plus a `plans/`
//! directory for plan artifacts. Building is idempotent and total: existing
//! directories are reused and both files are replaced wholesale, never
//! patched.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::{MAIN_TF, PROVIDERS_TF};
use crate::core::KeelError;
use crate::provision::ProvisionInput;
use crate::utils::{atomic_write, ensure_dir};

use super::renderer::{self, ProviderBlock};
use super::validator::ValidModule;

/// On-disk location of one provisioning project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Directory holding the rendered files and the tool's own state.
    pub state_dir: PathBuf,
    /// Directory plan artifacts are written into.
    pub plans_dir: PathBuf,
}

/// Builds project directories and rendered files from validated inputs.
pub struct ProjectBuilder {
    config: Config,
}

impl ProjectBuilder {
    /// New builder deriving project paths from `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
        }
    }

    /// Materializes the named project from the validated subset of a batch.
    ///
    /// Renders one module block per validated input and one provider set
    /// collected across all validated schemas, de-duplicated by provider
    /// name with the first occurrence winning.
    ///
    /// # Errors
    ///
    /// [`KeelError::NoProvidersDeclared`] when the validated schemas declare
    /// no provider at all; otherwise filesystem errors from creating the
    /// directories or writing the files.
    pub fn build(
        &self,
        validated: &[(&ProvisionInput, &ValidModule)],
        project: &str,
    ) -> Result<ProjectPaths> {
        let state_dir = self.config.state_dir(project);
        let plans_dir = self.config.plans_dir(project);
        ensure_dir(&state_dir)?;
        ensure_dir(&plans_dir)?;

        let main_tf = renderer::render_main_tf(validated);
        debug!(target: "terraform", "Rendered main.tf:\n{main_tf}");
        let main_path = state_dir.join(MAIN_TF);
        atomic_write(&main_path, main_tf.as_bytes())
            .with_context(|| format!("failed to write {}", main_path.display()))?;
        info!(target: "terraform", "Wrote {}", main_path.display());

        let providers = collect_providers(validated);
        if providers.is_empty() {
            return Err(KeelError::NoProvidersDeclared {
                project: project.to_string(),
            }
            .into());
        }

        let providers_tf = renderer::render_providers_tf(&providers);
        debug!(target: "terraform", "Rendered providers.tf:\n{providers_tf}");
        let providers_path = state_dir.join(PROVIDERS_TF);
        atomic_write(&providers_path, providers_tf.as_bytes())
            .with_context(|| format!("failed to write {}", providers_path.display()))?;
        info!(target: "terraform", "Wrote {}", providers_path.display());

        Ok(ProjectPaths {
            state_dir,
            plans_dir,
        })
    }
}

/// Collects provider declarations across all validated schemas.
///
/// De-duplicated by provider name; the first occurrence wins, including its
/// version constraint. The version is the schema's first declared constraint
/// or empty when the module pins nothing.
fn collect_providers(validated: &[(&ProvisionInput, &ValidModule)]) -> Vec<ProviderBlock> {
    let mut providers: Vec<ProviderBlock> = Vec::new();
    for (_, module) in validated {
        for (name, requirement) in &module.schema.required_providers {
            if providers.iter().any(|existing| &existing.name == name) {
                continue;
            }
            providers.push(ProviderBlock::new(
                name.clone(),
                requirement.source.clone(),
                requirement.primary_constraint(),
            ));
        }
    }
    providers
}
