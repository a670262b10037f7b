//! Destroy planning and teardown through the provisioner.

use tokio_util::sync::CancellationToken;

use keel::constants::{PLAN_EXIT_CHANGES, PLAN_EXIT_NO_CHANGES};
use keel::process::ExecOutput;

use super::common::{STORAGE_SCHEMA_JSON, TestEngine};

#[tokio::test]
async fn test_teardown_plans_with_destroy_then_destroys() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.teardown(&application, &deployment, &CancellationToken::new()).await.unwrap();

    assert_eq!(engine.terraform_operations(), vec!["init", "validate", "plan", "destroy"]);

    let plan_call = engine
        .runner
        .calls_for("terraform")
        .into_iter()
        .find(|call| call.is_operation("plan"))
        .unwrap();
    assert!(plan_call.args.contains(&"-destroy".to_string()));

    let destroy_call = engine
        .runner
        .calls_for("terraform")
        .into_iter()
        .find(|call| call.is_operation("destroy"))
        .unwrap();
    assert_eq!(destroy_call.args, vec!["destroy", "-auto-approve"]);
    assert_eq!(
        destroy_call.current_dir.as_deref(),
        Some(engine.state_dir("billing-stack").as_path())
    );
}

#[tokio::test]
async fn test_teardown_with_nothing_to_destroy_is_a_noop() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_NO_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.teardown(&application, &deployment, &CancellationToken::new()).await.unwrap();

    assert!(!engine.runner.saw_operation("terraform", "destroy"));
}

#[tokio::test]
async fn test_failed_destroy_plan_never_destroys() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.runner.on(
        |spec| spec.program == "terraform" && spec.operation() == "plan",
        ExecOutput::failure(1, "Error: state lock could not be acquired"),
    );
    engine.runner.on(|spec| spec.program == "terraform", ExecOutput::ok(""));
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.teardown(&application, &deployment, &CancellationToken::new()).await.unwrap();

    assert!(!engine.runner.saw_operation("terraform", "destroy"));
}

#[tokio::test]
async fn test_preview_destroy_reports_outcome_without_destroying() {
    let engine = TestEngine::new();
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    let outcome = provisioner
        .preview(&application, &deployment, true, &CancellationToken::new())
        .await
        .unwrap()
        .expect("terraform batch must yield an outcome");

    assert!(outcome.is_success());
    assert!(!engine.runner.saw_operation("terraform", "destroy"));
    assert!(!engine.runner.saw_operation("terraform", "apply"));
}
