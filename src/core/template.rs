//! Catalogued resource templates and their versions.
//!
//! A [`ResourceTemplate`] is a pinned, versioned pointer to a Terraform module
//! or Helm chart living in a remote git repository. Templates are read-only
//! inputs to the provisioning engine: the catalog creates them once and the
//! validators and drivers only ever read them.
//!
//! Two invariants are enforced at append time rather than checked lazily:
//! version labels are unique within a template, and so are (version, source)
//! pairs. Version labels are opaque strings, not semver.
//!
//! # Latest active version
//!
//! [`ResourceTemplate::latest_active_version`] returns the *most recently
//! appended* version whose state is [`VersionState::Active`]. Insertion order
//! defines recency; `"1.5"` appended after `"2.0"` is the latest. Callers that
//! want semantic-version selection must order their appends accordingly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::KeelError;

/// Infrastructure provider a template targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Terraform modules, provisioned through the terraform driver.
    Terraform,
    /// Helm charts. Validated today, not yet executed.
    Helm,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terraform => write!(f, "terraform"),
            Self::Helm => write!(f, "helm"),
        }
    }
}

/// Lifecycle state of a template version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionState {
    /// Selectable by provisioning.
    Active,
    /// Kept for history, skipped when resolving the latest version.
    Deprecated,
}

/// Where a template version's source tree lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSource {
    /// Base git repository URL.
    pub repository: String,
    /// Sub-folder inside the repository holding the module or chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Tag to pin the clone to. Unset means the default branch head.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl VersionSource {
    /// Source pointing at the default branch head of `repository`.
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            folder: None,
            tag: None,
        }
    }

    /// Restrict the source to a sub-folder of the repository.
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Pin the source to a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh random identity.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The nil identity, used before ownership is assigned.
            #[must_use]
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Identity of a [`ResourceTemplate`].
    TemplateId
}
uuid_id! {
    /// Identity of the organisation owning a template.
    OrganisationId
}
uuid_id! {
    /// Identity of a [`TemplateVersion`].
    VersionId
}

/// One pinned version of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersion {
    /// Identity of this version.
    pub id: VersionId,
    /// Owning template, assigned by [`ResourceTemplate::add_version`].
    pub template: TemplateId,
    /// Opaque version label. Uniqueness is enforced per template.
    pub version: String,
    /// Where the source tree for this version lives.
    pub source: VersionSource,
    /// Free-text release notes.
    pub notes: String,
    /// Lifecycle state.
    pub state: VersionState,
    /// When the version was catalogued.
    pub created_at: DateTime<Utc>,
}

impl TemplateVersion {
    /// New active version with a fresh identity and the current timestamp.
    pub fn new(version: impl Into<String>, source: VersionSource) -> Self {
        Self {
            id: VersionId::new(),
            template: TemplateId::nil(),
            version: version.into(),
            source,
            notes: String::new(),
            state: VersionState::Active,
            created_at: Utc::now(),
        }
    }

    /// Attach release notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Override the lifecycle state.
    #[must_use]
    pub const fn with_state(mut self, state: VersionState) -> Self {
        self.state = state;
        self
    }
}

/// A catalogued, versioned pointer to a Terraform module or Helm chart.
///
/// Versions are appended through [`add_version`](Self::add_version), which
/// enforces the uniqueness invariants and records ownership. The version list
/// preserves append order; that order defines which active version is
/// "latest".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTemplate {
    /// Identity of the template.
    pub id: TemplateId,
    /// Owning organisation.
    pub organisation: OrganisationId,
    /// Human-readable template name, e.g. `"Storage Account"`.
    pub name: String,
    /// Lookup key used by score-driven provisioning, e.g. `"azure.storage-account"`.
    pub type_tag: String,
    /// Free-text description.
    pub description: String,
    /// Which provider executes this template.
    pub provider: Provider,
    versions: Vec<TemplateVersion>,
}

impl ResourceTemplate {
    /// New template with no versions.
    pub fn new(
        organisation: OrganisationId,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        description: impl Into<String>,
        provider: Provider,
    ) -> Self {
        Self {
            id: TemplateId::new(),
            organisation,
            name: name.into(),
            type_tag: type_tag.into(),
            description: description.into(),
            provider,
            versions: Vec::new(),
        }
    }

    /// Append a version, enforcing the uniqueness invariants.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::DuplicateVersionSource`] when the exact
    /// (version, source) pair is already catalogued, or
    /// [`KeelError::DuplicateVersion`] when the label alone is taken.
    pub fn add_version(&mut self, mut version: TemplateVersion) -> Result<(), KeelError> {
        if self
            .versions
            .iter()
            .any(|v| v.version == version.version && v.source == version.source)
        {
            return Err(KeelError::DuplicateVersionSource {
                template: self.name.clone(),
                version: version.version,
            });
        }
        if self.versions.iter().any(|v| v.version == version.version) {
            return Err(KeelError::DuplicateVersion {
                template: self.name.clone(),
                version: version.version,
            });
        }
        version.template = self.id;
        self.versions.push(version);
        Ok(())
    }

    /// All catalogued versions in append order.
    #[must_use]
    pub fn versions(&self) -> &[TemplateVersion] {
        &self.versions
    }

    /// The most recently appended version whose state is Active.
    ///
    /// Recency is append order, never a semantic-version comparison.
    #[must_use]
    pub fn latest_active_version(&self) -> Option<&TemplateVersion> {
        self.versions.iter().rev().find(|v| v.state == VersionState::Active)
    }
}
