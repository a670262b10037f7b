//! Thin command-line facade over `terraform` and `terraform-config-inspect`.
//!
//! Each method builds the exact argument vector for one operation and hands
//! it to the [`CommandRunner`] capability. Exit codes come back raw inside
//! [`ExecOutput`]; interpreting them is the caller's job. That matters for
//! `plan`, whose `-detailed-exitcode` contract encodes "changes present" as
//! exit 2 rather than failure.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::constants::TOOL_TIMEOUT;
use crate::core::KeelError;
use crate::process::{CommandRunner, ExecOutput, ExecSpec};

/// Runs Terraform toolchain commands through a [`CommandRunner`].
///
/// Binary names come from [`Config::tools`](crate::config::ToolsConfig), so
/// deployments can point at absolute paths and tests at mocks.
pub struct TerraformTool {
    runner: Arc<dyn CommandRunner>,
    terraform: String,
    inspect: String,
}

impl TerraformTool {
    /// Creates a facade invoking `terraform` and the inspect binary by the
    /// given names.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        terraform: impl Into<String>,
        inspect: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            terraform: terraform.into(),
            inspect: inspect.into(),
        }
    }

    /// `terraform init` in `dir`.
    ///
    /// # Errors
    ///
    /// Fails only for environmental faults (missing binary, timeout,
    /// cancellation); a non-zero exit comes back as `Ok`.
    pub async fn init(&self, dir: &Path, cancel: &CancellationToken) -> Result<ExecOutput, KeelError> {
        self.run_terraform(dir, vec!["init".to_string()], cancel).await
    }

    /// `terraform validate` in `dir`.
    ///
    /// # Errors
    ///
    /// Same contract as [`init`](Self::init).
    pub async fn validate(&self, dir: &Path, cancel: &CancellationToken) -> Result<ExecOutput, KeelError> {
        self.run_terraform(dir, vec!["validate".to_string()], cancel).await
    }

    /// `terraform plan -detailed-exitcode -input=false [-destroy] -out=<plan_file>`
    /// in `dir`.
    ///
    /// With `-detailed-exitcode`, exit 0 means the project matches real
    /// infrastructure, exit 2 means a plan file with pending changes was
    /// written, and anything else is a planning error. The constants
    /// [`PLAN_EXIT_NO_CHANGES`](crate::constants::PLAN_EXIT_NO_CHANGES) and
    /// [`PLAN_EXIT_CHANGES`](crate::constants::PLAN_EXIT_CHANGES) name the
    /// interesting codes.
    ///
    /// # Errors
    ///
    /// Same contract as [`init`](Self::init).
    pub async fn plan(
        &self,
        dir: &Path,
        plan_file: &Path,
        destroy: bool,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, KeelError> {
        let mut args = vec![
            "plan".to_string(),
            "-detailed-exitcode".to_string(),
            "-input=false".to_string(),
        ];
        if destroy {
            args.push("-destroy".to_string());
        }
        args.push(format!("-out={}", plan_file.display()));
        self.run_terraform(dir, args, cancel).await
    }

    /// `terraform apply -auto-approve <plan_file>` in `dir`.
    ///
    /// # Errors
    ///
    /// Same contract as [`init`](Self::init).
    pub async fn apply(
        &self,
        dir: &Path,
        plan_file: &Path,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, KeelError> {
        let args = vec![
            "apply".to_string(),
            "-auto-approve".to_string(),
            plan_file.display().to_string(),
        ];
        self.run_terraform(dir, args, cancel).await
    }

    /// `terraform destroy -auto-approve` in `dir`.
    ///
    /// # Errors
    ///
    /// Same contract as [`init`](Self::init).
    pub async fn destroy(&self, dir: &Path, cancel: &CancellationToken) -> Result<ExecOutput, KeelError> {
        let args = vec!["destroy".to_string(), "-auto-approve".to_string()];
        self.run_terraform(dir, args, cancel).await
    }

    /// `terraform-config-inspect --json .` inside `module_dir`.
    ///
    /// Stdout carries the JSON document [`ModuleSchema::parse`] consumes.
    ///
    /// [`ModuleSchema::parse`]: crate::terraform::ModuleSchema::parse
    ///
    /// # Errors
    ///
    /// Same contract as [`init`](Self::init).
    pub async fn inspect_module(
        &self,
        module_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, KeelError> {
        debug!(target: "terraform", dir = %module_dir.display(), "Inspecting module schema");
        let spec = ExecSpec::new(&self.inspect)
            .args(["--json", "."])
            .current_dir(module_dir)
            .timeout(TOOL_TIMEOUT);
        self.runner.run(spec, cancel).await
    }

    async fn run_terraform(
        &self,
        dir: &Path,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, KeelError> {
        debug!(
            target: "terraform",
            dir = %dir.display(),
            operation = args.first().map(String::as_str).unwrap_or(""),
            "Running terraform"
        );
        let spec = ExecSpec::new(&self.terraform)
            .args(args)
            .current_dir(dir)
            .timeout(TOOL_TIMEOUT);
        self.runner.run(spec, cancel).await
    }
}
