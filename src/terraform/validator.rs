//! Terraform module validation.
//!
//! Validation takes one [`ProvisionInput`] from catalogue reference to a
//! reconciled, locally-materialized module: check the provider, resolve the
//! latest active version, clone its source into the cache, confirm the
//! module's structural shape, introspect its declared schema, and reconcile
//! the supplied parameters against it. Every rejection is a value carrying a
//! reason tag and a message naming the offending pieces; only cancellation
//! escapes as an error.
//!
//! Batches validate concurrently. [`TerraformValidator::validate_all`] fans
//! out one task per input, joins them all, and returns results aligned with
//! the input slice by position.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::{OUTPUTS_TF, VARIABLES_TF};
use crate::core::{KeelError, Provider};
use crate::git::SourceFetcher;
use crate::provision::ProvisionInput;
use crate::utils::find_file_recursive;

use super::schema::ModuleSchema;
use super::tool::TerraformTool;

/// Why a validation rejected its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The template names a different provider than this validator drives.
    WrongProvider,
    /// The template has no active version to provision from.
    ModuleNotFound,
    /// The module source could not be fetched, is structurally incomplete,
    /// or its schema could not be introspected.
    ModuleInvalid,
    /// The supplied parameters do not reconcile with the declared variables.
    InputInvalid,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::WrongProvider => "wrong provider",
            Self::ModuleNotFound => "module not found",
            Self::ModuleInvalid => "module invalid",
            Self::InputInvalid => "input invalid",
        };
        write!(f, "{reason}")
    }
}

/// Payload of a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidModule {
    /// Parsed module schema.
    pub schema: ModuleSchema,
    /// Local directory holding the validated module source.
    pub module_dir: PathBuf,
}

/// Outcome of validating one input against its template's module source.
///
/// Exactly one variant applies. `Invalid` is an expected outcome, not a
/// fault; callers skip the input and keep going with the rest of the batch.
#[derive(Debug, Clone, PartialEq)]
pub enum TerraformValidation {
    /// The input reconciles with the module; provisioning may proceed.
    Valid(ValidModule),
    /// The input was rejected.
    Invalid {
        /// Which pipeline step rejected it.
        reason: InvalidReason,
        /// Names the offending template, file or parameter keys.
        message: String,
    },
}

impl TerraformValidation {
    fn invalid(reason: InvalidReason, message: impl Into<String>) -> Self {
        Self::Invalid {
            reason,
            message: message.into(),
        }
    }

    /// Whether this is the `Valid` variant.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The valid payload, if any.
    #[must_use]
    pub const fn as_valid(&self) -> Option<&ValidModule> {
        match self {
            Self::Valid(module) => Some(module),
            Self::Invalid { .. } => None,
        }
    }

    /// The rejection reason, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid { reason, .. } => Some(*reason),
        }
    }

    /// The rejection message; empty for valid results.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Valid(_) => "",
            Self::Invalid { message, .. } => message,
        }
    }
}

/// Validates provisioning inputs against Terraform module sources.
pub struct TerraformValidator {
    fetcher: Arc<SourceFetcher>,
    tool: Arc<TerraformTool>,
    config: Config,
}

impl TerraformValidator {
    /// New validator resolving module sources through `fetcher` and module
    /// schemas through `tool`, with cache paths derived from `config`.
    pub fn new(fetcher: Arc<SourceFetcher>, tool: Arc<TerraformTool>, config: Config) -> Self {
        Self {
            fetcher,
            tool,
            config,
        }
    }

    /// Validates a whole batch concurrently.
    ///
    /// All inputs validate as independent tasks; the call returns once every
    /// task finished. Result `i` always corresponds to input `i`.
    ///
    /// # Errors
    ///
    /// [`KeelError::Cancelled`] when the token fires; rejections are values
    /// inside the returned vector.
    pub async fn validate_all(
        &self,
        inputs: &[ProvisionInput],
        cancel: &CancellationToken,
    ) -> Result<Vec<TerraformValidation>, KeelError> {
        let validations = inputs.iter().map(|input| self.validate(input, cancel));
        join_all(validations).await.into_iter().collect()
    }

    /// Validates one input.
    ///
    /// # Errors
    ///
    /// [`KeelError::Cancelled`] when the token fires mid-pipeline. Every
    /// other failure is an `Invalid` value.
    pub async fn validate(
        &self,
        input: &ProvisionInput,
        cancel: &CancellationToken,
    ) -> Result<TerraformValidation, KeelError> {
        let template = &input.template;
        info!(
            target: "terraform",
            "Validating template {} with the terraform driver",
            template.name
        );

        if template.provider != Provider::Terraform {
            return Ok(TerraformValidation::invalid(
                InvalidReason::WrongProvider,
                format!(
                    "template {} is configured for provider {}",
                    template.name, template.provider
                ),
            ));
        }

        let Some(version) = template.latest_active_version() else {
            return Ok(TerraformValidation::invalid(
                InvalidReason::ModuleNotFound,
                format!("no active version found for template {}", template.name),
            ));
        };

        let mut module_dir = self.config.module_cache_dir(&template.name, &version.version);
        match self.fetcher.fetch(&version.source, &module_dir, cancel).await {
            Ok(()) => {}
            Err(KeelError::Cancelled) => return Err(KeelError::Cancelled),
            Err(e) => {
                return Ok(TerraformValidation::invalid(
                    InvalidReason::ModuleInvalid,
                    format!(
                        "could not clone template {} from {}: {e}",
                        template.name, version.source.repository
                    ),
                ));
            }
        }

        if let Some(folder) = &version.source.folder {
            module_dir = module_dir.join(folder);
        }

        if let Some(message) = structural_gap(&module_dir) {
            return Ok(TerraformValidation::invalid(InvalidReason::ModuleInvalid, message));
        }

        let output = match self.tool.inspect_module(&module_dir, cancel).await {
            Ok(output) => output,
            Err(KeelError::Cancelled) => return Err(KeelError::Cancelled),
            Err(e) => {
                return Ok(TerraformValidation::invalid(
                    InvalidReason::ModuleInvalid,
                    format!("could not introspect module {}: {e}", module_dir.display()),
                ));
            }
        };
        if !output.success() {
            warn!(
                target: "terraform",
                "Introspection of {} exited {}: {}",
                module_dir.display(),
                output.exit_code,
                output.stderr.trim()
            );
            return Ok(TerraformValidation::invalid(
                InvalidReason::ModuleInvalid,
                format!("could not introspect module {}", module_dir.display()),
            ));
        }

        let schema = match ModuleSchema::parse(&output.stdout) {
            Ok(schema) => schema,
            Err(e) => {
                return Ok(TerraformValidation::invalid(
                    InvalidReason::ModuleInvalid,
                    format!("could not parse schema of module {}: {e}", module_dir.display()),
                ));
            }
        };

        Ok(reconcile(input, schema, module_dir))
    }
}

/// Structural check: a module must carry both a variables file and an
/// outputs file somewhere under its directory.
fn structural_gap(module_dir: &Path) -> Option<String> {
    if find_file_recursive(module_dir, VARIABLES_TF).is_none() {
        return Some(format!(
            "no {VARIABLES_TF} found under module directory {}",
            module_dir.display()
        ));
    }
    if find_file_recursive(module_dir, OUTPUTS_TF).is_none() {
        return Some(format!(
            "no {OUTPUTS_TF} found under module directory {}",
            module_dir.display()
        ));
    }
    None
}

/// Reconciles supplied parameters against the module's declared variables.
///
/// Matching is case-insensitive in both directions: a supplied key must
/// match some declared variable, and every required variable must be
/// matched by some supplied key. Declared optional variables may be
/// omitted freely.
fn reconcile(input: &ProvisionInput, schema: ModuleSchema, module_dir: PathBuf) -> TerraformValidation {
    let unknown: Vec<&str> = input
        .parameters
        .keys()
        .filter(|supplied| {
            !schema.variables.keys().any(|declared| declared.eq_ignore_ascii_case(supplied))
        })
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return TerraformValidation::invalid(
            InvalidReason::InputInvalid,
            format!("these inputs are not present in the module: {}", unknown.join(", ")),
        );
    }

    let missing: Vec<String> = schema
        .required_variables()
        .filter(|variable| {
            !input.parameters.keys().any(|supplied| supplied.eq_ignore_ascii_case(&variable.name))
        })
        .map(super::schema::ModuleVariable::name_and_type)
        .collect();
    if !missing.is_empty() {
        return TerraformValidation::invalid(
            InvalidReason::InputInvalid,
            format!(
                "these inputs are required by the module but were not provided: {}",
                missing.join(", ")
            ),
        );
    }

    TerraformValidation::Valid(ValidModule {
        schema,
        module_dir,
    })
}
