//! Template catalog capability.
//!
//! The provisioner resolves score resource types to catalogued templates
//! through [`TemplateCatalog`]. Two implementations ship: [`MemoryCatalog`]
//! for programmatic assembly and tests, and [`FileCatalog`] backed by a TOML
//! file for the CLI.
//!
//! Lookup is by exact `type_tag` equality; callers normalize score type tags
//! (trim, lowercase) before querying, so catalog files should use lowercase
//! tags.
//!
//! # Catalog file format
//!
//! ```toml
//! [[templates]]
//! name = "Storage Account"
//! type = "azure.storage-account"
//! description = "Azure blob storage"
//! provider = "terraform"
//!
//! [[templates.versions]]
//! version = "1.0.0"
//! repository = "https://example.com/modules.git"
//! folder = "modules/storage"   # optional
//! tag = "v1.0.0"               # optional
//! state = "active"             # optional, default active
//! notes = "initial release"    # optional
//! ```
//!
//! Versions are appended in file order, so the last active entry of a
//! template is its latest version.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::core::{
    KeelError, OrganisationId, Provider, ResourceTemplate, TemplateVersion, VersionSource,
    VersionState,
};

/// Resolves score resource types to catalogued templates.
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    /// The template whose `type_tag` equals `type_tag`, if catalogued.
    async fn get_by_type(&self, type_tag: &str) -> Result<Option<ResourceTemplate>>;
}

/// In-memory catalog assembled programmatically.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    templates: Vec<ResourceTemplate>,
}

impl MemoryCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with `template` appended.
    #[must_use]
    pub fn with_template(mut self, template: ResourceTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Append a template.
    pub fn add(&mut self, template: ResourceTemplate) {
        self.templates.push(template);
    }
}

#[async_trait]
impl TemplateCatalog for MemoryCatalog {
    async fn get_by_type(&self, type_tag: &str) -> Result<Option<ResourceTemplate>> {
        Ok(self.templates.iter().find(|t| t.type_tag == type_tag).cloned())
    }
}

/// Catalog loaded once from a TOML file.
///
/// Templates are built eagerly at load time, so format errors and version
/// invariant violations surface before any provisioning starts.
#[derive(Debug)]
pub struct FileCatalog {
    templates: Vec<ResourceTemplate>,
}

impl FileCatalog {
    /// Load a catalog file.
    ///
    /// # Errors
    ///
    /// [`KeelError::CatalogParseError`] when the file cannot be read, is not
    /// valid TOML, or a template violates the version-uniqueness invariants.
    pub fn load(path: &Path) -> Result<Self, KeelError> {
        let content = std::fs::read_to_string(path).map_err(|e| KeelError::CatalogParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, KeelError> {
        let parse_error = |reason: String| KeelError::CatalogParseError {
            file: path.display().to_string(),
            reason,
        };

        let document: CatalogDocument =
            toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;

        let mut templates = Vec::with_capacity(document.templates.len());
        for entry in document.templates {
            let mut template = ResourceTemplate::new(
                OrganisationId::nil(),
                entry.name,
                entry.type_tag,
                entry.description,
                entry.provider,
            );
            for version in entry.versions {
                let mut source = VersionSource::new(version.repository);
                if let Some(folder) = version.folder {
                    source = source.with_folder(folder);
                }
                if let Some(tag) = version.tag {
                    source = source.with_tag(tag);
                }
                let version = TemplateVersion::new(version.version, source)
                    .with_notes(version.notes)
                    .with_state(version.state);
                template.add_version(version).map_err(|e| parse_error(e.to_string()))?;
            }
            templates.push(template);
        }

        Ok(Self {
            templates,
        })
    }

    /// All catalogued templates in file order.
    #[must_use]
    pub fn templates(&self) -> &[ResourceTemplate] {
        &self.templates
    }
}

#[async_trait]
impl TemplateCatalog for FileCatalog {
    async fn get_by_type(&self, type_tag: &str) -> Result<Option<ResourceTemplate>> {
        Ok(self.templates.iter().find(|t| t.type_tag == type_tag).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    templates: Vec<TemplateEntry>,
}

#[derive(Debug, Deserialize)]
struct TemplateEntry {
    name: String,
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(default)]
    description: String,
    provider: Provider,
    #[serde(default)]
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
    repository: String,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    notes: String,
    #[serde(default = "default_version_state")]
    state: VersionState,
}

const fn default_version_state() -> VersionState {
    VersionState::Active
}
