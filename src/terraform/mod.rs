//! Terraform provisioning: module validation, project synthesis and the
//! plan/apply state machine.
//!
//! The pieces compose in one direction. The [`TerraformValidator`] turns
//! provisioning inputs into validated local modules, the [`ProjectBuilder`]
//! renders and materializes a project from the valid subset, and the
//! [`TerraformDriver`] sequences `init`, `validate` and `plan` over it,
//! gating `apply`/`destroy` on a successful plan.

pub mod driver;
pub mod project;
pub mod renderer;
pub mod schema;
pub mod tool;
pub mod validator;

pub use driver::{PlanOutcome, TerraformDriver};
pub use project::{ProjectBuilder, ProjectPaths};
pub use renderer::{ProviderBlock, render_main_tf, render_providers_tf};
pub use schema::{ModuleOutput, ModuleSchema, ModuleVariable, ProviderRequirement};
pub use tool::TerraformTool;
pub use validator::{InvalidReason, TerraformValidation, TerraformValidator, ValidModule};
