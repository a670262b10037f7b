//! Provider dispatch for provisioning batches.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::Provider;
use crate::helm::{HelmValidation, HelmValidator};
use crate::provision::ProvisionInput;
use crate::terraform::{PlanOutcome, TerraformDriver};

/// Partitions a mixed provisioning batch by provider and dispatches each
/// partition to its driver.
///
/// Terraform is the only executing path today: its partition is planned and
/// then applied (or destroyed). The Helm partition is validated against its
/// chart sources and the results logged, but nothing is installed; that
/// incompleteness is deliberate and not an error.
pub struct ResourceFactory {
    terraform: TerraformDriver,
    helm: HelmValidator,
}

impl ResourceFactory {
    pub fn new(terraform: TerraformDriver, helm: HelmValidator) -> Self {
        Self {
            terraform,
            helm,
        }
    }

    /// Plans and applies the batch under the `project` folder name.
    ///
    /// # Errors
    ///
    /// Driver faults (runner failures, cancellation) bubble up; validation
    /// rejections and failed plan states are handled inside the drivers and
    /// logged, not returned.
    pub async fn provision(
        &self,
        inputs: &[ProvisionInput],
        project: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let terraform = partition(inputs, Provider::Terraform);
        if !terraform.is_empty() {
            let outcome = self.terraform.plan(&terraform, project, false, cancel).await?;
            self.terraform.apply(&outcome, cancel).await?;
        }

        let helm = partition(inputs, Provider::Helm);
        if !helm.is_empty() {
            self.validate_helm(&helm, cancel).await?;
        }

        Ok(())
    }

    /// Plans the batch with `-destroy` and destroys the planned state.
    ///
    /// Only the Terraform partition participates: nothing was installed for
    /// Helm inputs, so there is nothing to tear down.
    ///
    /// # Errors
    ///
    /// Same contract as [`provision`](Self::provision).
    pub async fn delete(
        &self,
        inputs: &[ProvisionInput],
        project: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let terraform = partition(inputs, Provider::Terraform);
        if !terraform.is_empty() {
            let outcome = self.terraform.plan(&terraform, project, true, cancel).await?;
            self.terraform.destroy(&outcome, cancel).await?;
        }

        Ok(())
    }

    /// Plans without applying; the Helm partition is still validated.
    ///
    /// Returns the Terraform plan outcome, or `None` when the batch holds no
    /// Terraform inputs.
    ///
    /// # Errors
    ///
    /// Same contract as [`provision`](Self::provision).
    pub async fn preview(
        &self,
        inputs: &[ProvisionInput],
        project: &str,
        destroy: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<PlanOutcome>> {
        let helm = partition(inputs, Provider::Helm);
        if !helm.is_empty() {
            self.validate_helm(&helm, cancel).await?;
        }

        let terraform = partition(inputs, Provider::Terraform);
        if terraform.is_empty() {
            return Ok(None);
        }
        let outcome = self.terraform.plan(&terraform, project, destroy, cancel).await?;
        Ok(Some(outcome))
    }

    async fn validate_helm(
        &self,
        inputs: &[ProvisionInput],
        cancel: &CancellationToken,
    ) -> Result<()> {
        debug!(target: "provision", "Validating {} helm input(s); helm execution is not implemented", inputs.len());
        let results = self.helm.validate_all(inputs, cancel).await?;
        for (input, result) in inputs.iter().zip(&results) {
            match result {
                HelmValidation::Valid(_) => {
                    info!(target: "helm", "Helm validation for {} passed", input.template.name);
                }
                HelmValidation::Invalid {
                    reason,
                    message,
                } => {
                    error!(
                        target: "helm",
                        "Helm validation for {} failed: {reason} - {message}",
                        input.template.name
                    );
                }
            }
        }
        Ok(())
    }
}

fn partition(inputs: &[ProvisionInput], provider: Provider) -> Vec<ProvisionInput> {
    inputs.iter().filter(|input| input.template.provider == provider).cloned().collect()
}
