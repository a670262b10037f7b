//! Dependency-ordered provisioning of multi-resource batches.
//!
//! The dependency graph is an independent planning utility: callers build it
//! from their resource relationships, resolve a provisioning order, and only
//! then dispatch batches to the provisioner. These tests run that full
//! sequence.

use tokio_util::sync::CancellationToken;

use keel::constants::PLAN_EXIT_CHANGES;
use keel::core::KeelError;
use keel::graph::{DependencyGraph, ProvisionUnit};

use super::common::{CATALOG_TOML, STORAGE_SCHEMA_JSON, TestEngine, read_generated};

#[tokio::test]
async fn test_three_resource_chain_resolves_dependencies_first() {
    let mut graph = DependencyGraph::new();
    let a = ProvisionUnit::new("A");
    let b = ProvisionUnit::new("B");
    let c = ProvisionUnit::new("C");
    let (a_id, b_id, c_id) = (a.id, b.id, c.id);
    graph.add_resource(a);
    graph.add_resource(b);
    graph.add_resource(c);

    // C depends on B, B depends on A.
    graph.add_dependency(c_id, b_id).unwrap();
    graph.add_dependency(b_id, a_id).unwrap();

    let order: Vec<String> =
        graph.resolve_order().unwrap().iter().map(|unit| unit.identifier.clone()).collect();
    assert_eq!(order, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_batches_provision_in_resolved_order() {
    // Two score stacks where `web` builds on top of `base`: the caller
    // orders them through the graph before provisioning each project.
    let base_score = "\
metadata:
  name: base-stack
resources:
  db:
    type: azure.storage-account
    parameters:
      size: \"10\"
";
    let web_score = "\
metadata:
  name: web-stack
resources:
  assets:
    type: azure.storage-account
    parameters:
      size: \"5\"
";

    let mut graph = DependencyGraph::new();
    let base = ProvisionUnit::new("base-stack");
    let web = ProvisionUnit::new("web-stack");
    let (base_id, web_id) = (base.id, web.id);
    graph.add_resource(web);
    graph.add_resource(base);
    graph.add_dependency(web_id, base_id).unwrap();

    let order: Vec<String> =
        graph.resolve_order().unwrap().iter().map(|unit| unit.identifier.clone()).collect();
    assert_eq!(order, vec!["base-stack", "web-stack"]);

    let engine = TestEngine::with_files(base_score, CATALOG_TOML);
    engine.stub_terraform_module(STORAGE_SCHEMA_JSON);
    engine.stub_terraform(PLAN_EXIT_CHANGES);

    for project in &order {
        let score = if project == "base-stack" { base_score } else { web_score };
        std::fs::write(engine.temp.path().join("score.yaml"), score).unwrap();
        let provisioner = engine.provisioner();
        let (application, deployment) = engine.context();
        provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();
    }

    // Each project got its own state directory and module block.
    let base_main = read_generated(&engine.state_dir("base-stack"), "main.tf");
    assert!(base_main.contains("storage_account_db"));
    let web_main = read_generated(&engine.state_dir("web-stack"), "main.tf");
    assert!(web_main.contains("storage_account_assets"));

    // Two full plan/apply pipelines ran, base first.
    assert_eq!(
        engine.terraform_operations(),
        vec!["init", "validate", "plan", "apply", "init", "validate", "plan", "apply"]
    );
}

#[tokio::test]
async fn test_cyclic_batch_is_rejected_before_any_provisioning() {
    let mut graph = DependencyGraph::new();
    let base = ProvisionUnit::new("base-stack");
    let web = ProvisionUnit::new("web-stack");
    let (base_id, web_id) = (base.id, web.id);
    graph.add_resource(base);
    graph.add_resource(web);

    graph.add_dependency(web_id, base_id).unwrap();
    let err = graph.add_dependency(base_id, web_id).unwrap_err();
    assert!(matches!(err, KeelError::DependencyCycle { .. }));

    // The failed edge left the graph intact and resolvable.
    let order = graph.resolve_order().unwrap();
    assert_eq!(order.len(), 2);
    assert_eq!(order[0].identifier, "base-stack");
}
