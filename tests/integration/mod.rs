//! Integration test suite for keel
//!
//! End-to-end tests driving the provisioning engine the way the CLI does:
//! score and catalog files on disk, the full resolve/validate/render/plan
//! pipeline, and a mock command runner standing in for git and the terraform
//! toolchain so no network or cloud access is needed. These tests run in CI
//! on every commit.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! Tests are organized by functionality area:
//! - **cli**: Binary smoke tests (argument parsing, error reporting)
//! - **graph_ordering**: Dependency-ordered multi-resource batches
//! - **helm_flow**: Helm chart validation through the provisioner
//! - **provision_flow**: Score-driven plan/apply pipeline
//! - **teardown_flow**: Destroy planning and teardown

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

// Integration tests
mod cli;
mod graph_ordering;
mod helm_flow;
mod provision_flow;
mod teardown_flow;
