//! Helm chart validation.
//!
//! Mirrors the Terraform validation pipeline with the schema steps swapped
//! out: instead of structural files and introspection, a chart is described
//! by its `values.yaml`, recursively flattened into dotted/indexed keys
//! (`image.tag`, `service.ports[0]`). Reconciliation only checks that every
//! supplied parameter names some flattened key; charts surface no
//! required/optional distinction here.
//!
//! A chart without a `values.yaml` flattens to an empty key set: any
//! supplied parameter then fails reconciliation, while an input with no
//! parameters still validates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use serde_yaml::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::VALUES_YAML;
use crate::core::{KeelError, Provider};
use crate::git::SourceFetcher;
use crate::provision::ProvisionInput;
use crate::terraform::InvalidReason;
use crate::utils::find_file_recursive;

/// Payload of a successful chart validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmChart {
    /// Flattened `values.yaml` leaves: nested maps joined with `.`, list
    /// items indexed with `[i]`.
    pub values: BTreeMap<String, String>,
    /// Local directory holding the chart source.
    pub chart_dir: PathBuf,
}

/// Outcome of validating one input against its template's chart source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelmValidation {
    /// The input reconciles with the chart.
    Valid(HelmChart),
    /// The input was rejected.
    Invalid {
        /// Which pipeline step rejected it.
        reason: InvalidReason,
        /// Names the offending template, file or parameter keys.
        message: String,
    },
}

impl HelmValidation {
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
    pub const fn as_valid(&self) -> Option<&HelmChart> {
        match self {
            Self::Valid(chart) => Some(chart),
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

/// Validates provisioning inputs against Helm chart sources.
pub struct HelmValidator {
    fetcher: Arc<SourceFetcher>,
    config: Config,
}

impl HelmValidator {
    /// New validator resolving chart sources through `fetcher`, with cache
    /// paths derived from `config`.
    pub fn new(fetcher: Arc<SourceFetcher>, config: Config) -> Self {
        Self {
            fetcher,
            config,
        }
    }

    /// Validates a whole batch concurrently; result `i` corresponds to
    /// input `i`.
    ///
    /// # Errors
    ///
    /// [`KeelError::Cancelled`] when the token fires; rejections are values
    /// inside the returned vector.
    pub async fn validate_all(
        &self,
        inputs: &[ProvisionInput],
        cancel: &CancellationToken,
    ) -> Result<Vec<HelmValidation>, KeelError> {
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
    ) -> Result<HelmValidation, KeelError> {
        let template = &input.template;
        info!(target: "helm", "Validating template {} with the helm driver", template.name);

        if template.provider != Provider::Helm {
            return Ok(HelmValidation::invalid(
                InvalidReason::WrongProvider,
                format!(
                    "template {} is configured for provider {}",
                    template.name, template.provider
                ),
            ));
        }

        let Some(version) = template.latest_active_version() else {
            return Ok(HelmValidation::invalid(
                InvalidReason::ModuleNotFound,
                format!("no active version found for template {}", template.name),
            ));
        };

        let mut chart_dir = self.config.chart_cache_dir(&template.name, &version.version);
        match self.fetcher.fetch(&version.source, &chart_dir, cancel).await {
            Ok(()) => {}
            Err(KeelError::Cancelled) => return Err(KeelError::Cancelled),
            Err(e) => {
                return Ok(HelmValidation::invalid(
                    InvalidReason::ModuleInvalid,
                    format!(
                        "could not clone template {} from {}: {e}",
                        template.name, version.source.repository
                    ),
                ));
            }
        }

        if let Some(folder) = &version.source.folder {
            chart_dir = chart_dir.join(folder);
        }

        let values = match self.load_values(&chart_dir) {
            Ok(values) => values,
            Err(message) => {
                return Ok(HelmValidation::invalid(InvalidReason::ModuleInvalid, message));
            }
        };

        let unknown: Vec<&str> = input
            .parameters
            .keys()
            .filter(|supplied| !values.keys().any(|key| key.eq_ignore_ascii_case(supplied)))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Ok(HelmValidation::invalid(
                InvalidReason::InputInvalid,
                format!("these inputs are not present in the helm chart: {}", unknown.join(", ")),
            ));
        }

        Ok(HelmValidation::Valid(HelmChart {
            values,
            chart_dir,
        }))
    }

    /// Locates and flattens the chart's `values.yaml`.
    ///
    /// A missing file yields an empty map; an unreadable or unparsable one
    /// is an error message for the caller to wrap.
    fn load_values(&self, chart_dir: &Path) -> Result<BTreeMap<String, String>, String> {
        let Some(values_file) = find_file_recursive(chart_dir, VALUES_YAML) else {
            warn!(
                target: "helm",
                "No {VALUES_YAML} found under chart directory {}",
                chart_dir.display()
            );
            return Ok(BTreeMap::new());
        };

        let content = std::fs::read_to_string(&values_file)
            .map_err(|e| format!("could not read {}: {e}", values_file.display()))?;
        let root: Value = serde_yaml::from_str(&content)
            .map_err(|e| format!("could not parse {}: {e}", values_file.display()))?;
        Ok(flatten_values(&root))
    }
}

/// Flattens a YAML document into leaf key/value pairs.
///
/// Map entries join their path with `.`, sequence items append `[index]`,
/// and every scalar becomes one entry keyed by its full path. Empty maps
/// and sequences contribute nothing.
#[must_use]
pub fn flatten_values(root: &Value) -> BTreeMap<String, String> {
    let mut flattened = BTreeMap::new();
    flatten_into(root, String::new(), &mut flattened);
    flattened
}

fn flatten_into(node: &Value, prefix: String, out: &mut BTreeMap<String, String>) {
    match node {
        Value::Mapping(map) => {
            for (key, value) in map {
                let key = scalar_to_string(key);
                let full = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(value, full, out);
            }
        }
        Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(item, format!("{prefix}[{index}]"), out);
            }
        }
        Value::Tagged(tagged) => flatten_into(&tagged.value, prefix, out),
        scalar => {
            out.insert(prefix, scalar_to_string(scalar));
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(value) => value.to_string(),
        Value::Number(value) => value.to_string(),
        Value::String(value) => value.clone(),
        other => serde_yaml::to_string(other).map(|s| s.trim().to_string()).unwrap_or_default(),
    }
}
