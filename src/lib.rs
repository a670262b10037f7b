//! keel - score-driven infrastructure provisioning
//!
//! A provisioning engine for catalogued Terraform modules and Helm charts:
//! given a versioned template catalog and a score descriptor declaring what a
//! deployment needs, keel fetches each template's source from git, validates
//! the supplied inputs against the module or chart schema, renders a
//! provisioning project on disk, and drives `terraform` through init,
//! validate, plan and apply.
//!
//! # Architecture Overview
//!
//! keel follows a resolve/validate/render/execute model:
//! - A **score descriptor** (`score.yaml`) maps resource keys to a template
//!   type tag plus parameters
//! - The **catalog** (`catalog.toml`) pins each type tag to versioned git
//!   sources for a Terraform module or Helm chart
//! - Every batch is validated concurrently against the fetched sources
//!   before a single file is rendered
//! - External tools run out of process behind an injectable runner, so the
//!   whole pipeline is testable with canned exit codes and output
//!
//! ## Key Features
//!
//! - **Typed outcomes**: validation rejections and plan results are values,
//!   never exceptions - a failed plan is a state to inspect, not a crash
//! - **Batch-friendly failure handling**: one unresolvable resource is
//!   logged and skipped without aborting its siblings
//! - **Deterministic rendering**: ordered maps end to end, so rebuilding the
//!   same project produces byte-identical files
//! - **Cancellation-aware**: a single token threads through every clone,
//!   validation and tool invocation; a cancelled batch never applies
//! - **Dependency ordering**: an arena-based DAG yields a deterministic
//!   provisioning order and rejects cycles at insertion time
//!
//! # Core Modules
//!
//! ## Engine
//! - [`catalog`] - template catalog capability with memory and TOML file backends
//! - [`score`] - score descriptor types and the source capability
//! - [`provision`] - batch resolution, provider dispatch, execution entry point
//! - [`terraform`] - schema introspection, validation, rendering, plan/apply driver
//! - [`helm`] - chart validation and `values.yaml` flattening
//! - [`graph`] - dependency graph with cycle-safe topological ordering
//!
//! ## Infrastructure
//! - [`process`] - external command capability, system and mock runners
//! - [`git`] - source fetcher: head, tag-pinned and commit-pinned clones
//! - [`config`] - data directory layout and external tool names
//! - [`core`] - error types, user-facing error reporting, the template model
//! - [`cli`] - the `keel` binary: provision, teardown and preview commands
//!
//! # Catalog Format (catalog.toml)
//!
//! ```toml
//! [[templates]]
//! name = "Storage Account"
//! type = "azure.storage-account"
//! provider = "terraform"
//!
//! [[templates.versions]]
//! version = "1.0.0"
//! repository = "https://example.com/modules.git"
//! folder = "modules/storage"
//! tag = "v1.0.0"
//! ```
//!
//! # Score Format (score.yaml)
//!
//! ```yaml
//! metadata:
//!   name: billing-stack
//! resources:
//!   db:
//!     type: azure.storage-account
//!     parameters:
//!       size: small
//!       region: westeurope
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Plan and apply everything the descriptor declares
//! keel provision --score ./score.yaml --catalog ./catalog.toml
//!
//! # Inspect the plan without applying
//! keel preview --score ./score.yaml --catalog ./catalog.toml
//!
//! # Tear the batch down again
//! keel teardown --score ./score.yaml --catalog ./catalog.toml
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod git;
pub mod graph;
pub mod helm;
pub mod process;
pub mod provision;
pub mod score;
pub mod terraform;
pub mod utils;

// test_utils is available to both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
