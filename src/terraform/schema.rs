//! Parsed terraform module schema.
//!
//! The validator runs the module-introspection tool
//! (`terraform-config-inspect --json .`) inside a cloned module directory and
//! deserializes its stdout into [`ModuleSchema`]: the declared variables,
//! outputs, and required providers. Unknown fields in the tool's output
//! (source positions, diagnostics, resource listings) are ignored.
//!
//! Maps are ordered so that everything derived from a schema, the rendered
//! provider block in particular, is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared variables, outputs and provider requirements of one module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSchema {
    /// Declared input variables, keyed by name.
    #[serde(default)]
    pub variables: BTreeMap<String, ModuleVariable>,
    /// Declared outputs, keyed by name.
    #[serde(default)]
    pub outputs: BTreeMap<String, ModuleOutput>,
    /// Providers the module requires, keyed by provider name.
    #[serde(default)]
    pub required_providers: BTreeMap<String, ProviderRequirement>,
}

impl ModuleSchema {
    /// Parse the introspection tool's JSON stdout.
    ///
    /// # Errors
    ///
    /// Fails when the text is not valid JSON of the expected shape.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Declared variables marked required (no default value).
    pub fn required_variables(&self) -> impl Iterator<Item = &ModuleVariable> {
        self.variables.values().filter(|v| v.required)
    }
}

/// One declared input variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleVariable {
    /// Variable name.
    #[serde(default)]
    pub name: String,
    /// Declared type expression, e.g. `string` or `map(string)`.
    #[serde(default, rename = "type")]
    pub var_type: Option<String>,
    /// Description, when declared.
    #[serde(default)]
    pub description: Option<String>,
    /// Default value, when declared.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Whether a caller must supply this variable.
    #[serde(default)]
    pub required: bool,
}

impl ModuleVariable {
    /// `name:type` rendering used in missing-input messages.
    #[must_use]
    pub fn name_and_type(&self) -> String {
        format!("{}:{}", self.name, self.var_type.as_deref().unwrap_or_default())
    }
}

/// One declared output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutput {
    /// Output name.
    #[serde(default)]
    pub name: String,
    /// Description, when declared.
    #[serde(default)]
    pub description: Option<String>,
}

/// One required provider declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequirement {
    /// Provider source address, e.g. `hashicorp/azurerm`.
    #[serde(default)]
    pub source: String,
    /// Version constraints in declaration order.
    #[serde(default)]
    pub version_constraints: Vec<String>,
}

impl ProviderRequirement {
    /// The first declared constraint, or empty when none is declared.
    #[must_use]
    pub fn primary_constraint(&self) -> &str {
        self.version_constraints.first().map_or("", String::as_str)
    }
}
