//! Renders the generated project files, `main.tf` and `providers.tf`.
//!
//! Rendering is pure text assembly over already-validated inputs. Parameter
//! maps are ordered, so rebuilding the same project produces byte-identical
//! files.

use crate::provision::ProvisionInput;

use super::validator::ValidModule;

/// One entry of the rendered `required_providers` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBlock {
    /// Provider name as declared by the module, e.g. `"azurerm"`.
    pub name: String,
    /// Registry source address, e.g. `"hashicorp/azurerm"`.
    pub source: String,
    /// Version constraint; empty when the module declares none.
    pub version: String,
}

impl ProviderBlock {
    /// Creates a provider entry.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            version: version.into(),
        }
    }
}

/// Renders one `module` block per validated input.
///
/// The block is named `<template>_<key>` (lowercased, spaces to
/// underscores), its `source` points at the validated module directory in
/// the local cache, and each supplied parameter becomes an assignment with
/// [`quote_if_needed`] deciding its literal form.
#[must_use]
pub fn render_main_tf(validated: &[(&ProvisionInput, &ValidModule)]) -> String {
    let mut out = String::new();
    for (input, module) in validated {
        let name = module_block_name(&input.template.name, &input.key);
        out.push_str(&format!("module \"{name}\" {{\n"));
        out.push_str(&format!(
            "  source = \"{}\"\n",
            module.module_dir.display()
        ));
        for (parameter, value) in &input.parameters {
            out.push_str(&format!("  {parameter} = {}\n", quote_if_needed(value)));
        }
        out.push_str("}\n\n");
    }
    out
}

/// Renders the `terraform { required_providers { ... } }` block followed by
/// one empty `features {}` stanza per provider.
#[must_use]
pub fn render_providers_tf(providers: &[ProviderBlock]) -> String {
    let mut out = String::from("terraform {\n  required_providers {\n");
    for provider in providers {
        out.push_str(&format!("    {} = {{\n", provider.name));
        out.push_str(&format!("      source  = \"{}\"\n", provider.source));
        out.push_str(&format!("      version = \"{}\"\n", provider.version));
        out.push_str("    }\n");
    }
    out.push_str("  }\n}\n");

    for provider in providers {
        out.push_str(&format!(
            "\nprovider \"{}\" {{\n  features {{}}\n}}\n",
            provider.name
        ));
    }
    out
}

/// Module block identifier: `<template>_<key>`, lowercased with spaces
/// replaced by underscores.
fn module_block_name(template_name: &str, key: &str) -> String {
    let template = template_name.replace(' ', "_").to_lowercase();
    let key = key.replace(' ', "_").trim().to_lowercase();
    format!("{template}_{key}")
}

/// Decides the literal form of a parameter value.
///
/// Booleans and numbers pass through unquoted; a bracketed value is treated
/// as a list literal with single quotes normalized to double quotes;
/// everything else is emitted as a quoted string.
fn quote_if_needed(value: &str) -> String {
    if value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("false")
        || value.parse::<i64>().is_ok()
        || value.parse::<f64>().is_ok()
    {
        return value.to_string();
    }
    if value.starts_with('[') && value.ends_with(']') {
        return value.replace('\'', "\"");
    }
    format!("\"{value}\"")
}
