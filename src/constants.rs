//! Global constants used throughout the keel codebase.
//!
//! This module contains timeout durations, directory-layout segment names,
//! and external tool defaults that are used across multiple modules.
//! Defining them centrally improves maintainability and makes magic
//! values more discoverable.

use std::time::Duration;

/// Timeout for git clone operations (120 seconds).
///
/// Clone operations may take longer than other commands, especially
/// for large repositories.
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for git fetch operations (60 seconds).
///
/// This prevents hung network connections from blocking commit-pinned
/// checkouts indefinitely.
pub const GIT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for short local git commands such as `init` (30 seconds).
pub const GIT_LOCAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for terraform invocations (15 minutes).
///
/// Plan and apply can legitimately run for a long time against slow
/// cloud APIs; this bound exists to catch hung processes, not slow ones.
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(900);

/// Default git executable name.
pub const GIT_BIN: &str = "git";

/// Default terraform executable name.
pub const TERRAFORM_BIN: &str = "terraform";

/// Default module-introspection executable name.
///
/// Invoked with `--json .` in a module directory; stdout is the JSON
/// schema the validators deserialize.
pub const INSPECT_BIN: &str = "terraform-config-inspect";

/// Directory name holding all keel state under the data directory.
pub const DATA_DIR_NAME: &str = ".keel";

/// Environment variable overriding the data directory location.
pub const DATA_DIR_ENV: &str = "KEEL_DATA_DIR";

/// Layout segment for terraform-related directories.
pub const TERRAFORM_DIR: &str = "terraform";

/// Layout segment for the terraform module clone cache.
pub const MODULES_DIR: &str = "modules";

/// Layout segment for generated provisioning projects.
pub const STATE_DIR: &str = "state";

/// Layout segment for plan artifacts inside a project directory.
pub const PLANS_DIR: &str = "plans";

/// Layout segment for the helm chart clone cache.
pub const HELM_DIR: &str = "helm";

/// Rendered module-invocations file name.
pub const MAIN_TF: &str = "main.tf";

/// Rendered provider-requirements file name.
pub const PROVIDERS_TF: &str = "providers.tf";

/// Chart values file name located during helm validation.
pub const VALUES_YAML: &str = "values.yaml";

/// Structural files a terraform module must contain somewhere in its tree.
pub const VARIABLES_TF: &str = "variables.tf";
pub const OUTPUTS_TF: &str = "outputs.tf";

/// `chrono` format string for plan artifact names:
/// `plan-<yyyyMMddTHHmmssfff>.tfplan`.
pub const PLAN_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";

/// Exit code terraform's `plan -detailed-exitcode` uses for "diff present".
pub const PLAN_EXIT_CHANGES: i32 = 2;

/// Exit code for a clean plan with nothing to do.
pub const PLAN_EXIT_NO_CHANGES: i32 = 0;
