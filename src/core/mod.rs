//! Core types for keel
//!
//! This module is the foundation of keel's type system: the error enum and
//! user-facing error reporting, and the catalogued template data model every
//! other module consumes.
//!
//! # Error Management
//!
//! keel separates two kinds of failure:
//! - **Fatal faults** ([`KeelError`]) - missing tools, I/O, timeouts,
//!   cancellation, and programming-contract violations such as dependency
//!   cycles or an empty provider set. These halt the calling batch.
//! - **Expected provisioning outcomes** - a module failing validation or a
//!   plan exiting non-zero. These are values (tagged result enums in the
//!   `terraform` and `helm` modules), never errors.
//!
//! [`ErrorContext`] and [`user_friendly_error`] turn any fatal fault into the
//! colored, suggestion-bearing message the CLI prints.
//!
//! # Template Model
//!
//! [`ResourceTemplate`] and [`TemplateVersion`] describe catalogued,
//! git-hosted Terraform modules and Helm charts. Templates are read-only
//! inputs to the engine; their append-time invariants (unique version labels,
//! unique version/source pairs) and the insertion-order "latest active"
//! policy live here.

pub mod error;
pub mod template;

pub use error::{ErrorContext, KeelError, is_cancellation, user_friendly_error};
pub use template::{
    OrganisationId, Provider, ResourceTemplate, TemplateId, TemplateVersion, VersionId,
    VersionSource, VersionState,
};
