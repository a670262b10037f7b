//! The Terraform provisioning state machine.
//!
//! [`TerraformDriver::plan`] runs the whole pipeline for one project:
//! validate the batch, materialize the project files, then `init`,
//! `validate` and `plan` in the state directory. The outcome is a
//! [`PlanOutcome`] value whose variant records how far the pipeline got;
//! `apply` and `destroy` act only on a `Success` outcome and deliberately
//! do nothing for every other state.
//!
//! Failed validations inside a batch are logged and dropped; planning
//! proceeds with the valid subset. Only a batch where nothing validated
//! stops early, before any external tool runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::constants::{PLAN_EXIT_CHANGES, PLAN_EXIT_NO_CHANGES, PLAN_TIMESTAMP_FORMAT};
use crate::git::SourceFetcher;
use crate::process::ExecOutput;
use crate::provision::ProvisionInput;

use super::project::ProjectBuilder;
use super::tool::TerraformTool;
use super::validator::{TerraformValidation, TerraformValidator, ValidModule};

/// How far a plan run got, with the artifacts each stage produced.
///
/// The first four variants are terminal failures. `NoChanges` is a terminal
/// no-op: the project already matches real infrastructure. Only `Success`
/// enables a subsequent apply or destroy.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// Not a single input in the batch validated successfully.
    PreValidationFailed {
        /// Why the batch was rejected.
        message: String,
    },
    /// `terraform init` exited non-zero.
    InitFailed {
        /// Materialized state directory.
        state_dir: PathBuf,
        /// Raw init output.
        output: ExecOutput,
    },
    /// `terraform validate` exited non-zero.
    ValidateFailed {
        /// Materialized state directory.
        state_dir: PathBuf,
        /// Raw validate output.
        output: ExecOutput,
    },
    /// `terraform plan` reported an error.
    PlanFailed {
        /// Materialized state directory.
        state_dir: PathBuf,
        /// Artifact path the plan would have been written to.
        plan_file: PathBuf,
        /// Raw plan output.
        output: ExecOutput,
    },
    /// The plan found nothing to change.
    NoChanges {
        /// Materialized state directory.
        state_dir: PathBuf,
        /// Artifact path passed to the plan invocation.
        plan_file: PathBuf,
        /// Raw plan output.
        output: ExecOutput,
    },
    /// A plan with pending changes was written; apply/destroy may proceed.
    Success {
        /// Materialized state directory.
        state_dir: PathBuf,
        /// Written plan artifact.
        plan_file: PathBuf,
        /// Raw plan output.
        output: ExecOutput,
    },
}

impl PlanOutcome {
    /// The state name, for logs.
    #[must_use]
    pub const fn state_name(&self) -> &'static str {
        match self {
            Self::PreValidationFailed { .. } => "PreValidationFailed",
            Self::InitFailed { .. } => "InitFailed",
            Self::ValidateFailed { .. } => "ValidateFailed",
            Self::PlanFailed { .. } => "PlanFailed",
            Self::NoChanges { .. } => "NoChanges",
            Self::Success { .. } => "Success",
        }
    }

    /// Whether this outcome enables apply/destroy.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The materialized state directory, when the pipeline got that far.
    #[must_use]
    pub fn state_dir(&self) -> Option<&Path> {
        match self {
            Self::PreValidationFailed { .. } => None,
            Self::InitFailed { state_dir, .. }
            | Self::ValidateFailed { state_dir, .. }
            | Self::PlanFailed { state_dir, .. }
            | Self::NoChanges { state_dir, .. }
            | Self::Success { state_dir, .. } => Some(state_dir),
        }
    }

    /// The plan artifact path, when the plan stage ran.
    #[must_use]
    pub fn plan_file(&self) -> Option<&Path> {
        match self {
            Self::PlanFailed { plan_file, .. }
            | Self::NoChanges { plan_file, .. }
            | Self::Success { plan_file, .. } => Some(plan_file),
            _ => None,
        }
    }
}

/// Drives Terraform provisioning end to end for one project at a time.
pub struct TerraformDriver {
    validator: TerraformValidator,
    builder: ProjectBuilder,
    tool: Arc<TerraformTool>,
}

impl TerraformDriver {
    /// New driver assembling its validator and project builder from the
    /// shared fetcher, tool facade and configuration.
    pub fn new(fetcher: Arc<SourceFetcher>, tool: Arc<TerraformTool>, config: Config) -> Self {
        let validator = TerraformValidator::new(fetcher, Arc::clone(&tool), config.clone());
        let builder = ProjectBuilder::new(config);
        Self {
            validator,
            builder,
            tool,
        }
    }

    /// Validates the batch, materializes the project and plans it.
    ///
    /// With `destroy` set, the plan is computed for tearing the project
    /// down instead of converging it. Either way the plan artifact is
    /// written under the project's `plans/` directory with a
    /// timestamp-derived name.
    ///
    /// # Errors
    ///
    /// Fatal faults only: cancellation, a builder invariant violation
    /// (no providers declared), or an environmental process failure.
    /// Everything the state machine models comes back as a [`PlanOutcome`].
    pub async fn plan(
        &self,
        inputs: &[ProvisionInput],
        project: &str,
        destroy: bool,
        cancel: &CancellationToken,
    ) -> Result<PlanOutcome> {
        let validations = self.validator.validate_all(inputs, cancel).await?;

        let mut validated: Vec<(&ProvisionInput, &ValidModule)> = Vec::new();
        for (input, validation) in inputs.iter().zip(&validations) {
            match validation {
                TerraformValidation::Valid(module) => validated.push((input, module)),
                TerraformValidation::Invalid { reason, message } => {
                    error!(
                        target: "terraform",
                        "Validation failed for {}: {reason} - {message}",
                        input.template.name
                    );
                }
            }
        }

        if validated.is_empty() {
            error!(
                target: "terraform",
                "Refusing to plan {project}: no input validated successfully"
            );
            return Ok(PlanOutcome::PreValidationFailed {
                message: "no input in the batch validated successfully".to_string(),
            });
        }

        let paths = self.builder.build(&validated, project)?;

        let init = self.tool.init(&paths.state_dir, cancel).await?;
        if !init.success() {
            warn!(
                target: "terraform",
                "terraform init exited {} in {}: {}",
                init.exit_code,
                paths.state_dir.display(),
                init.stderr.trim()
            );
            return Ok(PlanOutcome::InitFailed {
                state_dir: paths.state_dir,
                output: init,
            });
        }
        debug!(target: "terraform", "Init output: {}", init.stdout.trim());

        let validate = self.tool.validate(&paths.state_dir, cancel).await?;
        if !validate.success() {
            warn!(
                target: "terraform",
                "terraform validate exited {} in {}: {}",
                validate.exit_code,
                paths.state_dir.display(),
                validate.stderr.trim()
            );
            return Ok(PlanOutcome::ValidateFailed {
                state_dir: paths.state_dir,
                output: validate,
            });
        }
        debug!(target: "terraform", "Validate output: {}", validate.stdout.trim());

        let plan_file = paths
            .plans_dir
            .join(format!("plan-{}.tfplan", Utc::now().format(PLAN_TIMESTAMP_FORMAT)));
        let plan = self.tool.plan(&paths.state_dir, &plan_file, destroy, cancel).await?;

        match plan.exit_code {
            PLAN_EXIT_NO_CHANGES => {
                info!(target: "terraform", "Plan for {project} found no changes");
                Ok(PlanOutcome::NoChanges {
                    state_dir: paths.state_dir,
                    plan_file,
                    output: plan,
                })
            }
            PLAN_EXIT_CHANGES => {
                debug!(target: "terraform", "Plan output: {}", plan.stdout.trim());
                info!(target: "terraform", "Successfully planned {project}");
                Ok(PlanOutcome::Success {
                    state_dir: paths.state_dir,
                    plan_file,
                    output: plan,
                })
            }
            _ => {
                warn!(
                    target: "terraform",
                    "terraform plan exited {}: {}",
                    plan.exit_code,
                    plan.stderr.trim()
                );
                Ok(PlanOutcome::PlanFailed {
                    state_dir: paths.state_dir,
                    plan_file,
                    output: plan,
                })
            }
        }
    }

    /// Applies a planned outcome.
    ///
    /// Anything but `Success` logs and returns without touching the tool;
    /// in particular `NoChanges` is a clean no-op, not a failure.
    ///
    /// # Errors
    ///
    /// Environmental process faults and cancellation only.
    pub async fn apply(&self, outcome: &PlanOutcome, cancel: &CancellationToken) -> Result<()> {
        match outcome {
            PlanOutcome::PreValidationFailed { message } => {
                warn!(
                    target: "terraform",
                    "Plan was not in an applyable state: PreValidationFailed - {message}"
                );
            }
            PlanOutcome::InitFailed { .. }
            | PlanOutcome::ValidateFailed { .. }
            | PlanOutcome::PlanFailed { .. } => {
                warn!(
                    target: "terraform",
                    "Plan was not in an applyable state: {}",
                    outcome.state_name()
                );
            }
            PlanOutcome::NoChanges { .. } => {
                info!(target: "terraform", "No changes needed in this plan");
            }
            PlanOutcome::Success { state_dir, plan_file, .. } => {
                info!(target: "terraform", "Running terraform apply in {}", state_dir.display());
                let result = self.tool.apply(state_dir, plan_file, cancel).await?;
                if result.success() {
                    info!(target: "terraform", "Terraform apply finished: {}", result.stdout.trim());
                } else {
                    warn!(
                        target: "terraform",
                        "terraform apply exited {}: {}",
                        result.exit_code,
                        result.stderr.trim()
                    );
                }
            }
        }
        Ok(())
    }

    /// Destroys the infrastructure a `Success` outcome planned for teardown.
    ///
    /// Same state switch as [`apply`](Self::apply); every non-`Success`
    /// outcome logs and does nothing.
    ///
    /// # Errors
    ///
    /// Environmental process faults and cancellation only.
    pub async fn destroy(&self, outcome: &PlanOutcome, cancel: &CancellationToken) -> Result<()> {
        match outcome {
            PlanOutcome::PreValidationFailed { message } => {
                warn!(
                    target: "terraform",
                    "Plan was not in a destroyable state: PreValidationFailed - {message}"
                );
            }
            PlanOutcome::InitFailed { .. }
            | PlanOutcome::ValidateFailed { .. }
            | PlanOutcome::PlanFailed { .. } => {
                warn!(
                    target: "terraform",
                    "Plan was not in a destroyable state: {}",
                    outcome.state_name()
                );
            }
            PlanOutcome::NoChanges { .. } => {
                info!(target: "terraform", "No changes needed in this plan");
            }
            PlanOutcome::Success { state_dir, .. } => {
                info!(target: "terraform", "Running terraform destroy in {}", state_dir.display());
                let result = self.tool.destroy(state_dir, cancel).await?;
                if result.success() {
                    info!(target: "terraform", "Terraform destroy finished: {}", result.stdout.trim());
                } else {
                    warn!(
                        target: "terraform",
                        "terraform destroy exited {}: {}",
                        result.exit_code,
                        result.stderr.trim()
                    );
                }
            }
        }
        Ok(())
    }
}
