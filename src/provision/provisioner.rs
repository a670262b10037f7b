//! Score-driven provisioning entry point.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::TemplateCatalog;
use crate::provision::{ProvisionInput, ResourceFactory};
use crate::score::{Application, Deployment, ScoreFile, ScoreSource};
use crate::terraform::PlanOutcome;

/// Turns a deployment's score descriptor into a provisioning batch.
///
/// The provisioner owns resolution only: loading the descriptor, looking up
/// each declared resource's template in the catalog, and skipping resources
/// that cannot be resolved. Execution belongs to the [`ResourceFactory`].
///
/// Resolution failures are per-resource: an unknown type tag or a resource
/// without parameters is logged and skipped, never aborting its siblings.
pub struct ResourceProvisioner {
    score: Arc<dyn ScoreSource>,
    catalog: Arc<dyn TemplateCatalog>,
    factory: ResourceFactory,
}

impl ResourceProvisioner {
    pub fn new(
        score: Arc<dyn ScoreSource>,
        catalog: Arc<dyn TemplateCatalog>,
        factory: ResourceFactory,
    ) -> Self {
        Self {
            score,
            catalog,
            factory,
        }
    }

    /// Provisions everything the deployment's score descriptor declares.
    ///
    /// A missing descriptor means nothing to provision and is not an error.
    ///
    /// # Errors
    ///
    /// Descriptor parse faults, catalog faults and driver faults bubble up;
    /// per-resource resolution failures are logged and skipped.
    pub async fn start(
        &self,
        application: &Application,
        deployment: &Deployment,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(score) = self.score.load(application, deployment).await? else {
            warn!(target: "provision", "No score descriptor found for application {}", application.name);
            return Ok(());
        };

        info!(
            target: "provision",
            "Provisioning {} resource(s) from score descriptor {}",
            score.resources.len(),
            score.metadata.name
        );

        let inputs = self.resolve_inputs(&score).await?;
        self.factory.provision(&inputs, &score.metadata.name, cancel).await
    }

    /// Tears down everything the deployment's score descriptor declares.
    ///
    /// Mirrors [`start`](Self::start) with the factory's delete path.
    ///
    /// # Errors
    ///
    /// Same contract as [`start`](Self::start).
    pub async fn teardown(
        &self,
        application: &Application,
        deployment: &Deployment,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(score) = self.score.load(application, deployment).await? else {
            warn!(target: "provision", "No score descriptor found for application {}", application.name);
            return Ok(());
        };

        info!(
            target: "provision",
            "Tearing down {} resource(s) from score descriptor {}",
            score.resources.len(),
            score.metadata.name
        );

        let inputs = self.resolve_inputs(&score).await?;
        self.factory.delete(&inputs, &score.metadata.name, cancel).await
    }

    /// Plans the descriptor's batch without applying it.
    ///
    /// Returns the Terraform plan outcome, or `None` when there is no
    /// descriptor or no Terraform input survives resolution.
    ///
    /// # Errors
    ///
    /// Same contract as [`start`](Self::start).
    pub async fn preview(
        &self,
        application: &Application,
        deployment: &Deployment,
        destroy: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<PlanOutcome>> {
        let Some(score) = self.score.load(application, deployment).await? else {
            warn!(target: "provision", "No score descriptor found for application {}", application.name);
            return Ok(None);
        };

        let inputs = self.resolve_inputs(&score).await?;
        self.factory.preview(&inputs, &score.metadata.name, destroy, cancel).await
    }

    /// Resolves declared resources to provisioning inputs, skipping what
    /// cannot be resolved.
    async fn resolve_inputs(&self, score: &ScoreFile) -> Result<Vec<ProvisionInput>> {
        let mut inputs = Vec::new();

        for (key, resource) in &score.resources {
            let type_tag = resource.type_tag.trim().to_lowercase();

            let Some(template) = self.catalog.get_by_type(&type_tag).await? else {
                info!(target: "provision", "No catalogued template for type {type_tag}, skipping resource {key}");
                continue;
            };

            let Some(parameters) = &resource.parameters else {
                info!(target: "provision", "Resource {key} declares no parameters, skipping");
                continue;
            };

            inputs.push(ProvisionInput::new(template, key).with_parameters(parameters.clone()));
        }

        Ok(inputs)
    }
}
