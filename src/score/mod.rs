//! Score descriptor types and the source capability.
//!
//! A score file declares what a deployment wants provisioned: a named
//! metadata block plus a map of resource key to `{type, parameters}`.
//! Where the file comes from is a collaborator concern behind
//! [`ScoreSource`]; the engine only consumes the parsed shape.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::KeelError;

/// Application context for a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub name: String,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Deployment context: which commit of the application is being deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub commit: String,
}

impl Deployment {
    pub fn new(commit: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
        }
    }
}

/// Parsed score descriptor.
///
/// Unknown keys (`apiVersion`, per-resource `class`/`id` and the like) are
/// ignored on deserialization; a missing `resources` block reads as an
/// empty map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScoreFile {
    pub metadata: ScoreMetadata,
    #[serde(default)]
    pub resources: BTreeMap<String, ScoreResource>,
}

/// Descriptor metadata; `name` becomes the provisioning project name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScoreMetadata {
    pub name: String,
}

/// One declared resource: a template type tag plus its parameters.
///
/// `parameters` stays optional: a resource without a `parameters` key is
/// skipped by the provisioner, while an explicit empty map provisions with
/// no inputs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScoreResource {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, String>>,
}

/// Where score descriptors come from.
///
/// `Ok(None)` means "no descriptor for this deployment", which callers
/// treat as nothing to provision rather than a fault.
#[async_trait]
pub trait ScoreSource: Send + Sync {
    async fn load(
        &self,
        application: &Application,
        deployment: &Deployment,
    ) -> Result<Option<ScoreFile>>;
}

/// Reads a score descriptor from a YAML file on disk.
pub struct FileScoreSource {
    path: PathBuf,
}

impl FileScoreSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScoreSource for FileScoreSource {
    async fn load(
        &self,
        application: &Application,
        deployment: &Deployment,
    ) -> Result<Option<ScoreFile>> {
        if !self.path.exists() {
            warn!(target: "score", "No score file found at {}", self.path.display());
            return Ok(None);
        }

        info!(
            target: "score",
            "Loading score file for application {} at commit {}",
            application.name,
            deployment.commit
        );

        let content =
            tokio::fs::read_to_string(&self.path).await.map_err(|e| KeelError::ScoreParseError {
                file: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        let score: ScoreFile =
            serde_yaml::from_str(&content).map_err(|e| KeelError::ScoreParseError {
                file: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let declared: Vec<&str> = score.resources.keys().map(String::as_str).collect();
        info!(target: "score", "Score file declares resources: {}", declared.join(", "));

        Ok(Some(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCORE: &str = "\
apiVersion: score.dev/v1b1
metadata:
  name: billing-stack
resources:
  db:
    type: azure.storage-account
    class: standard
    parameters:
      size: small
      region: westeurope
  cache:
    type: helm.redis
";

    fn context() -> (Application, Deployment) {
        (Application::new("Billing"), Deployment::new("0a1b2c3d4e5f"))
    }

    #[test]
    fn test_deserialize_descriptor() {
        let score: ScoreFile = serde_yaml::from_str(SCORE).unwrap();

        assert_eq!(score.metadata.name, "billing-stack");
        assert_eq!(score.resources.len(), 2);

        let db = &score.resources["db"];
        assert_eq!(db.type_tag, "azure.storage-account");
        let parameters = db.parameters.as_ref().unwrap();
        assert_eq!(parameters["size"], "small");
        assert_eq!(parameters["region"], "westeurope");

        // No parameters key at all reads as None, not an empty map.
        assert_eq!(score.resources["cache"].parameters, None);
    }

    #[test]
    fn test_missing_resources_block_reads_as_empty() {
        let score: ScoreFile = serde_yaml::from_str("metadata:\n  name: empty-stack\n").unwrap();
        assert!(score.resources.is_empty());
    }

    #[tokio::test]
    async fn test_file_source_loads_descriptor() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("score.yaml");
        std::fs::write(&path, SCORE).unwrap();
        let (application, deployment) = context();

        let source = FileScoreSource::new(&path);
        let score = source.load(&application, &deployment).await.unwrap();

        assert_eq!(score.unwrap().metadata.name, "billing-stack");
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        let (application, deployment) = context();

        let source = FileScoreSource::new(temp.path().join("absent.yaml"));
        let score = source.load(&application, &deployment).await.unwrap();

        assert!(score.is_none());
    }

    #[tokio::test]
    async fn test_unparsable_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("score.yaml");
        std::fs::write(&path, "metadata: [not a map").unwrap();
        let (application, deployment) = context();

        let source = FileScoreSource::new(&path);
        let err = source.load(&application, &deployment).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<KeelError>(),
            Some(KeelError::ScoreParseError { .. })
        ));
    }
}
