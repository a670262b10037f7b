//! Common test utilities and fixtures for keel integration tests
//!
//! This module consolidates frequently used test patterns to reduce
//! duplication: on-disk score/catalog fixtures, the mock-runner rules that
//! stand in for git and the terraform toolchain, and a pre-wired provisioning
//! engine over those fakes.

// Allow dead code because these utilities are shared across test files and
// not every test file uses all of them
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use keel::catalog::FileCatalog;
use keel::config::Config;
use keel::git::SourceFetcher;
use keel::helm::HelmValidator;
use keel::process::mock::MockRunner;
use keel::process::{ExecOutput, ExecSpec};
use keel::provision::{ResourceFactory, ResourceProvisioner};
use keel::score::{Application, Deployment, FileScoreSource};
use keel::terraform::{TerraformDriver, TerraformTool};
use keel::test_utils::init_test_logging;

/// Introspection JSON for a storage-account style module: one required
/// variable, one optional variable with a default, and one provider.
pub const STORAGE_SCHEMA_JSON: &str = r#"{
    "variables": {
        "size": {"name": "size", "type": "string", "required": true},
        "region": {"name": "region", "type": "string", "default": "westeurope", "required": false}
    },
    "outputs": {"id": {"name": "id", "description": "resource id"}},
    "required_providers": {
        "azurerm": {"source": "hashicorp/azurerm", "version_constraints": [">= 3.0"]}
    }
}"#;

/// A catalog with one terraform template and one helm template.
pub const CATALOG_TOML: &str = r#"
[[templates]]
name = "Storage Account"
type = "azure.storage-account"
description = "Azure blob storage"
provider = "terraform"

[[templates.versions]]
version = "1.0.0"
repository = "https://example.com/modules.git"
tag = "v1.0.0"

[[templates]]
name = "Redis Chart"
type = "helm.redis"
provider = "helm"

[[templates.versions]]
version = "0.3.0"
repository = "https://example.com/charts.git"
"#;

/// A score descriptor declaring one terraform resource with valid inputs.
pub const SCORE_TERRAFORM: &str = "\
metadata:
  name: billing-stack
resources:
  db:
    type: azure.storage-account
    parameters:
      size: \"10\"
      region: westeurope
";

/// Provisioning engine wired over a [`MockRunner`], with score and catalog
/// files on disk the way the CLI consumes them.
pub struct TestEngine {
    pub runner: Arc<MockRunner>,
    pub config: Config,
    /// Keeps the data/score/catalog directory alive for the test's duration.
    pub temp: TempDir,
    score_path: PathBuf,
    catalog_path: PathBuf,
}

impl TestEngine {
    /// New engine with the default catalog and score fixtures.
    pub fn new() -> Self {
        Self::with_files(SCORE_TERRAFORM, CATALOG_TOML)
    }

    /// New engine with specific score and catalog file contents.
    ///
    /// Also wires the test tracing subscriber, so `RUST_LOG=debug` surfaces
    /// the engine's log flow inside captured test output.
    pub fn with_files(score: &str, catalog: &str) -> Self {
        init_test_logging(None);

        let temp = TempDir::new().expect("failed to create temp dir");
        let score_path = temp.path().join("score.yaml");
        let catalog_path = temp.path().join("catalog.toml");
        std::fs::write(&score_path, score).expect("failed to write score fixture");
        std::fs::write(&catalog_path, catalog).expect("failed to write catalog fixture");

        let config = Config::default().with_data_dir(temp.path().join("data"));
        Self {
            runner: Arc::new(MockRunner::new()),
            config,
            temp,
            score_path,
            catalog_path,
        }
    }

    /// Assemble the provisioner exactly the way the CLI does, but over the
    /// mock runner.
    pub fn provisioner(&self) -> ResourceProvisioner {
        let catalog = FileCatalog::load(&self.catalog_path).expect("catalog fixture must parse");
        let fetcher = Arc::new(SourceFetcher::new(self.runner.clone(), "git"));
        let tool = Arc::new(TerraformTool::new(
            self.runner.clone(),
            "terraform",
            "terraform-config-inspect",
        ));
        let terraform = TerraformDriver::new(fetcher.clone(), tool, self.config.clone());
        let helm = HelmValidator::new(fetcher, self.config.clone());
        ResourceProvisioner::new(
            Arc::new(FileScoreSource::new(&self.score_path)),
            Arc::new(catalog),
            ResourceFactory::new(terraform, helm),
        )
    }

    /// Application/deployment context for provisioner calls.
    pub fn context(&self) -> (Application, Deployment) {
        (Application::new("Billing"), Deployment::new("0a1b2c3d4e5f"))
    }

    /// Generated state directory for a project name.
    pub fn state_dir(&self, project: &str) -> PathBuf {
        self.config.state_dir(project)
    }

    /// Stub `git clone` to materialize a terraform module (variables.tf,
    /// outputs.tf) and the introspection tool to answer with `schema_json`.
    pub fn stub_terraform_module(&self, schema_json: &'static str) {
        self.runner.on_with_effect(
            |spec| spec.program == "git" && spec.operation() == "clone",
            ExecOutput::ok(""),
            write_module_files,
        );
        self.runner.on(
            |spec| spec.program == "terraform-config-inspect",
            ExecOutput::ok(schema_json),
        );
    }

    /// Stub `git clone` to materialize a helm chart with the given
    /// `values.yaml` content.
    pub fn stub_helm_chart(&self, values_yaml: &'static str) {
        self.runner.on_with_effect(
            |spec| spec.program == "git" && spec.operation() == "clone",
            ExecOutput::ok(""),
            move |spec| {
                let dest = clone_dest(spec);
                std::fs::create_dir_all(&dest).expect("failed to create chart dir");
                std::fs::write(dest.join("values.yaml"), values_yaml)
                    .expect("failed to write values.yaml");
            },
        );
    }

    /// Stub every terraform operation to succeed, with `plan` answering the
    /// given exit code (0 = no changes, 2 = changes present).
    pub fn stub_terraform(&self, plan_exit: i32) {
        self.runner.on(
            |spec| spec.program == "terraform" && spec.operation() == "plan",
            ExecOutput {
                exit_code: plan_exit,
                stdout: "Plan: 1 to add, 0 to change, 0 to destroy.".to_string(),
                stderr: String::new(),
            },
        );
        self.runner.on(|spec| spec.program == "terraform", ExecOutput::ok(""));
    }

    /// Recorded terraform operations, in invocation order.
    pub fn terraform_operations(&self) -> Vec<String> {
        self.runner
            .calls_for("terraform")
            .iter()
            .map(|call| call.args.first().cloned().unwrap_or_default())
            .collect()
    }
}

/// The destination directory of a recorded git clone invocation.
pub fn clone_dest(spec: &ExecSpec) -> PathBuf {
    PathBuf::from(spec.args.last().expect("clone spec must carry a destination"))
}

/// Materializes a minimal structurally-valid terraform module at the clone
/// destination.
pub fn write_module_files(spec: &ExecSpec) {
    let dest = clone_dest(spec);
    std::fs::create_dir_all(&dest).expect("failed to create module dir");
    std::fs::write(dest.join("variables.tf"), "variable \"size\" {}\n")
        .expect("failed to write variables.tf");
    std::fs::write(dest.join("outputs.tf"), "output \"id\" {}\n")
        .expect("failed to write outputs.tf");
}

/// Read a generated file from a project state directory.
pub fn read_generated(state_dir: &Path, file: &str) -> String {
    std::fs::read_to_string(state_dir.join(file))
        .unwrap_or_else(|e| panic!("failed to read generated {file}: {e}"))
}
