//! The unit of work handed to validators and the factory.

use std::collections::BTreeMap;

use crate::core::ResourceTemplate;

/// One requested resource instance in a provisioning batch.
///
/// Carries the catalogued template, the caller-supplied parameter values and
/// a key disambiguating multiple instances of the same template within one
/// batch (two storage accounts from the same module, say). The parameter map
/// is ordered so everything rendered from it is deterministic across
/// rebuilds of the same project.
#[derive(Debug, Clone)]
pub struct ProvisionInput {
    /// Template to provision from.
    pub template: ResourceTemplate,
    /// Flat string parameter map, as supplied by the caller.
    pub parameters: BTreeMap<String, String>,
    /// Caller-supplied instance key (the score resource key).
    pub key: String,
}

impl ProvisionInput {
    /// Creates an input with an empty parameter map.
    pub fn new(template: ResourceTemplate, key: impl Into<String>) -> Self {
        Self {
            template,
            parameters: BTreeMap::new(),
            key: key.into(),
        }
    }

    /// Adds one parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Replaces the whole parameter map.
    #[must_use]
    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }
}
