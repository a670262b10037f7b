//! End-to-end score-driven provisioning over the mock runner.
//!
//! These tests exercise the whole pipeline the `provision` command runs:
//! score file → catalog lookup → concurrent validation (tag-pinned clone,
//! structural check, schema introspection, input reconciliation) → project
//! rendering → init/validate/plan → apply.

use tokio_util::sync::CancellationToken;

use keel::constants::{PLAN_EXIT_CHANGES, PLAN_EXIT_NO_CHANGES};

use super::common::{
    CATALOG_TOML, STORAGE_SCHEMA_JSON, TestEngine, read_generated,
};

#[tokio::test]
async fn test_provision_runs_the_full_pipeline() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    // Tag-pinned clone into the module cache.
    let clones = engine.runner.calls_for("git");
    assert_eq!(clones.len(), 1);
    assert_eq!(clones[0].args[0], "clone");
    assert!(clones[0].args.contains(&"--branch".to_string()));
    assert!(clones[0].args.contains(&"v1.0.0".to_string()));
    let dest = clones[0].args.last().unwrap();
    assert!(dest.contains("terraform/modules/Storage.Account/1.0.0"), "clone dest: {dest}");

    // Strictly sequenced tool pipeline, then apply.
    assert_eq!(engine.terraform_operations(), vec!["init", "validate", "plan", "apply"]);
}

#[tokio::test]
async fn test_provision_renders_the_project_files() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    // The project is named after the score metadata.
    let state_dir = engine.state_dir("billing-stack");
    let main_tf = read_generated(&state_dir, "main.tf");
    assert!(main_tf.contains("module \"storage_account_db\" {"), "main.tf:\n{main_tf}");
    assert!(main_tf.contains("size = 10"));
    assert!(main_tf.contains("region = \"westeurope\""));

    let providers_tf = read_generated(&state_dir, "providers.tf");
    assert!(providers_tf.contains("azurerm = {"));
    assert!(providers_tf.contains("source  = \"hashicorp/azurerm\""));
    assert!(providers_tf.contains("version = \">= 3.0\""));
    assert!(providers_tf.contains("provider \"azurerm\" {\n  features {}\n}"));

    // The plan artifact landed under the project's plans directory.
    let plans: Vec<_> = std::fs::read_dir(state_dir.join("plans"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    // The mock does not write the file, but the plan invocation named it.
    let plan_call = engine
        .runner
        .calls_for("terraform")
        .into_iter()
        .find(|call| call.is_operation("plan"))
        .unwrap();
    assert!(
        plan_call.args.iter().any(|arg| arg.starts_with("-out=")
            && arg.contains("billing-stack/plans/plan-")
            && arg.ends_with(".tfplan")),
        "plan args: {:?} (plans dir held {plans:?})",
        plan_call.args
    );
}

#[tokio::test]
async fn test_provision_rebuild_is_idempotent() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();
    let state_dir = engine.state_dir("billing-stack");
    let first_main = read_generated(&state_dir, "main.tf");
    let first_providers = read_generated(&state_dir, "providers.tf");

    // Second run re-clones into the populated cache and rewrites the same
    // files byte for byte.
    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();
    assert_eq!(read_generated(&state_dir, "main.tf"), first_main);
    assert_eq!(read_generated(&state_dir, "providers.tf"), first_providers);
}

#[tokio::test]
async fn test_no_changes_plan_skips_apply() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_NO_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    assert_eq!(engine.terraform_operations(), vec!["init", "validate", "plan"]);
    assert!(!engine.runner.saw_operation("terraform", "apply"));
}

#[tokio::test]
async fn test_unresolvable_resource_is_skipped_without_aborting_siblings() {
    let score = "\
metadata:
  name: billing-stack
resources:
  db:
    type: azure.storage-account
    parameters:
      size: \"10\"
  queue:
    type: unknown.queue
    parameters:
      depth: \"5\"
  orphan:
    type: azure.storage-account
";
    let engine = TestEngine::with_files(score, CATALOG_TOML);
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    // Only `db` survives resolution: `queue` has no catalogued template and
    // `orphan` declares no parameters. The batch still plans and applies.
    let main_tf = read_generated(&engine.state_dir("billing-stack"), "main.tf");
    assert!(main_tf.contains("storage_account_db"));
    assert!(!main_tf.contains("queue"));
    assert!(!main_tf.contains("orphan"));
    assert!(engine.runner.saw_operation("terraform", "apply"));
}

#[tokio::test]
async fn test_invalid_input_keeps_valid_siblings_planning() {
    let score = "\
metadata:
  name: billing-stack
resources:
  db:
    type: azure.storage-account
    parameters:
      size: \"10\"
  bad:
    type: azure.storage-account
    parameters:
      color: purple
";
    let engine = TestEngine::with_files(score, CATALOG_TOML);
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    // `bad` fails reconciliation (undeclared `color`, missing required
    // `size`) and is dropped; `db` is rendered and applied alone.
    let main_tf = read_generated(&engine.state_dir("billing-stack"), "main.tf");
    assert!(main_tf.contains("storage_account_db"));
    assert!(!main_tf.contains("storage_account_bad"));
    assert!(engine.runner.saw_operation("terraform", "apply"));
}

#[tokio::test]
async fn test_nothing_validating_stops_before_any_tool_run() {
    let score = "\
metadata:
  name: billing-stack
resources:
  bad:
    type: azure.storage-account
    parameters:
      color: purple
";
    let engine = TestEngine::with_files(score, CATALOG_TOML);
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    // Validation cloned and introspected, but the driver refused to plan.
    assert!(engine.runner.calls_for("terraform").is_empty());
    assert!(!engine.state_dir("billing-stack").join("main.tf").exists());
}

#[tokio::test]
async fn test_clone_failure_is_a_validation_rejection_not_a_fault() {
    let engine = TestEngine::new();
    // No clone effect: git answers non-zero and the destination never
    // appears, so validation rejects the module.
    engine.runner.on(
        |spec| spec.program == "git",
        keel::process::ExecOutput::failure(128, "fatal: repository not found"),
    );
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    assert!(engine.runner.calls_for("terraform").is_empty());
}

#[tokio::test]
async fn test_cancelled_batch_never_reaches_apply() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = provisioner.start(&application, &deployment, &cancel).await;

    assert!(result.is_err());
    assert!(!engine.runner.saw_operation("terraform", "apply"));
}
