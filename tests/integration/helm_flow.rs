//! Helm chart validation through the provisioner.
//!
//! Helm inputs are validated against their chart's flattened `values.yaml`
//! but never installed; the factory accepts the partition as a deliberate
//! no-op. These tests pin both halves of that contract.

use tokio_util::sync::CancellationToken;

use super::common::{CATALOG_TOML, TestEngine};

const VALUES_YAML: &str = "\
replicaCount: 1
image:
  repository: redis
  tag: stable
service:
  ports:
    - 6379
    - 6380
";

const SCORE_HELM: &str = "\
metadata:
  name: cache-stack
resources:
  cache:
    type: helm.redis
    parameters:
      replicaCount: \"3\"
      image.tag: \"7.2\"
      service.ports[0]: \"6400\"
";

#[tokio::test]
async fn test_helm_batch_validates_against_flattened_values() {
    let engine = TestEngine::with_files(SCORE_HELM, CATALOG_TOML);
    engine.stub_helm_chart(VALUES_YAML);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    // One chart clone into the helm cache, no tag pinning for this version.
    let clones = engine.runner.calls_for("git");
    assert_eq!(clones.len(), 1);
    assert!(!clones[0].args.contains(&"--branch".to_string()));
    let dest = clones[0].args.last().unwrap();
    assert!(dest.contains("helm/Redis Chart/0.3.0"), "clone dest: {dest}");

    // Nothing is installed for helm.
    assert!(engine.runner.calls_for("terraform").is_empty());
    assert!(engine.runner.calls_for("helm").is_empty());
}

#[tokio::test]
async fn test_unknown_helm_parameter_is_rejected_but_not_fatal() {
    let score = "\
metadata:
  name: cache-stack
resources:
  cache:
    type: helm.redis
    parameters:
      replicaCount: \"3\"
      persistence.enabled: \"true\"
";
    let engine = TestEngine::with_files(score, CATALOG_TOML);
    engine.stub_helm_chart(VALUES_YAML);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    // `persistence.enabled` names no flattened key; the rejection is logged
    // and the batch still completes.
    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    assert_eq!(engine.runner.calls_for("git").len(), 1);
}

#[tokio::test]
async fn test_chart_without_values_accepts_only_parameterless_inputs() {
    let score = "\
metadata:
  name: cache-stack
resources:
  cache:
    type: helm.redis
    parameters: {}
";
    let engine = TestEngine::with_files(score, CATALOG_TOML);
    // Clone succeeds but materializes a chart with no values.yaml at all.
    engine.runner.on_with_effect(
        |spec| spec.program == "git" && spec.operation() == "clone",
        keel::process::ExecOutput::ok(""),
        |spec| {
            let dest = super::common::clone_dest(spec);
            std::fs::create_dir_all(dest.join("templates")).unwrap();
        },
    );
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    assert_eq!(engine.runner.calls_for("git").len(), 1);
    assert!(engine.runner.calls_for("terraform").is_empty());
}

#[tokio::test]
async fn test_mixed_batch_partitions_by_provider() {
    let score = "\
metadata:
  name: billing-stack
resources:
  db:
    type: azure.storage-account
    parameters:
      size: \"10\"
  cache:
    type: helm.redis
    parameters:
      replicaCount: \"3\"
";
    let engine = TestEngine::with_files(score, CATALOG_TOML);
    // One clone rule serves both caches: module files for the terraform
    // destination, values.yaml for the helm destination.
    engine.runner.on_with_effect(
        |spec| spec.program == "git" && spec.operation() == "clone",
        keel::process::ExecOutput::ok(""),
        |spec| {
            let dest = super::common::clone_dest(spec);
            if dest.to_string_lossy().contains("terraform/modules") {
                super::common::write_module_files(spec);
            } else {
                std::fs::create_dir_all(&dest).unwrap();
                std::fs::write(dest.join("values.yaml"), "replicaCount: 1\n").unwrap();
            }
        },
    );
    engine.runner.on(
        |spec| spec.program == "terraform-config-inspect",
        keel::process::ExecOutput::ok(super::common::STORAGE_SCHEMA_JSON),
    );
    engine.stub_terraform(keel::constants::PLAN_EXIT_CHANGES);
    let provisioner = engine.provisioner();
    let (application, deployment) = engine.context();

    provisioner.start(&application, &deployment, &CancellationToken::new()).await.unwrap();

    // Both partitions fetched their sources; only terraform executed.
    let dests: Vec<String> =
        engine.runner.calls_for("git").iter().map(|c| c.args.last().unwrap().clone()).collect();
    assert_eq!(dests.len(), 2);
    assert!(dests.iter().any(|dest| dest.contains("terraform/modules")));
    assert!(dests.iter().any(|dest| dest.contains("helm/")));
    assert!(engine.runner.saw_operation("terraform", "apply"));
}
