// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use hive_core::domain::node_config::HiveConfigManifest;
use hive_core::domain::task::{TaskParams, TaskStatus};
use hive_orchestrator::agents::LocalAgentFactory;
use hive_orchestrator::backends::{LocalInference, LocalTools};
use hive_orchestrator::commands::run::run_workload;
use hive_orchestrator::embedded::Hive;
use hive_orchestrator::workload::Workload;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const WORKLOAD: &str = r#"
templates:
  - name: crawlers
    description: Echo pair plus an auditor
    agents:
      - { type: echo, name: crawler-1 }
      - { type: echo, name: crawler-2 }
      - { type: logger, name: audit }
      - { type: teleporter, name: nope }
swarms:
  - { name: crew, template: crawlers }
tasks:
  - { type: generate, params: { prompt: "hello hive" } }
  - { type: analyze, params: { text: "one two three" } }
  - { type: tool, params: { toolType: math, operation: sum, values: [1, 2, 3] } }
  - { type: swarm, swarm: crew, params: { task: { id: crawl-1, url: "https://example.com" } } }
  - { type: generate, params: {} }
"#;

async fn hive(factory: Arc<LocalAgentFactory>) -> Hive {
    Hive::initialize(
        HiveConfigManifest::default(),
        factory,
        Arc::new(LocalInference),
        Arc::new(LocalTools),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_workload_runs_end_to_end() {
    let factory = Arc::new(LocalAgentFactory::new());
    let hive = hive(factory.clone()).await;
    let workload = Workload::from_yaml_str(WORKLOAD).unwrap();

    let report = run_workload(&hive, &workload, Duration::from_secs(5))
        .await
        .unwrap();

    // The unknown agent type is skipped during provisioning.
    assert_eq!(report.swarms.len(), 1);
    assert_eq!(report.swarms[0].2, 3);

    assert_eq!(report.tasks.len(), 5);
    assert_eq!(report.failures(), 1);
    let swarm_task = report.tasks[3].result.as_ref().unwrap();
    assert_eq!(swarm_task.status, TaskStatus::Completed);
    assert_eq!(swarm_task.result.as_ref().unwrap()["deliveredTo"], 3);

    let missing_prompt = report.tasks[4].result.as_ref().unwrap();
    assert_eq!(missing_prompt.status, TaskStatus::Failed);
    assert!(missing_prompt.error.as_deref().unwrap().contains("prompt"));

    let echoes: Vec<_> = factory
        .spawned()
        .into_iter()
        .filter(|a| a.received_tasks().iter().any(|t| t.id() == "crawl-1"))
        .collect();
    assert_eq!(echoes.len(), 3);

    hive.shutdown().await.unwrap();
    assert_eq!(hive.registry().swarm_count(), 0);
    assert_eq!(hive.registry().agent_count(), 0);
    assert!(factory.spawned().iter().all(|a| !a.is_running()));
}

#[tokio::test]
async fn test_shutdown_closes_task_admission() {
    let hive = hive(Arc::new(LocalAgentFactory::new())).await;
    assert_eq!(
        hive.task_manager().handler_types(),
        vec!["analyze", "generate", "search", "swarm", "tool"]
    );

    hive.shutdown().await.unwrap();
    assert!(hive
        .task_manager()
        .create_task("generate", TaskParams::new())
        .is_err());
    // A second shutdown is harmless.
    hive.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = HiveConfigManifest::default();
    config.spec.tasks.max_workers = 0;
    let result = Hive::initialize(
        config,
        Arc::new(LocalAgentFactory::new()),
        Arc::new(LocalInference),
        Arc::new(LocalTools),
    )
    .await;
    assert!(result.is_err());
}

#[test]
fn test_config_file_round_trip_via_tempfile() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
apiVersion: 100monkeys.ai/v1
kind: HiveConfig
metadata:
  name: test-node
spec:
  swarm:
    maxSwarms: 3
  tasks:
    maxWorkers: 2
"#
    )
    .unwrap();

    let config = HiveConfigManifest::from_yaml_file(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.metadata.name, "test-node");
    assert_eq!(config.spec.swarm.max_swarms, 3);
    assert_eq!(config.spec.swarm.max_agents_per_swarm, 10);
    assert_eq!(config.spec.tasks.max_workers, 2);
    assert_eq!(config.spec.tasks.max_queue_size, 100);
}

#[test]
fn test_workload_file_loading() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(WORKLOAD.as_bytes()).unwrap();
    let workload = Workload::from_yaml_file(file.path()).unwrap();
    assert_eq!(workload.templates[0].agents.len(), 4);
    assert_eq!(workload.tasks.len(), 5);
}
