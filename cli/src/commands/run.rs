// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `hive run` - execute a workload file against an embedded Hive
//!
//! Templates are registered, swarms instantiated, then every task is
//! submitted before any is awaited so the worker pool runs them concurrently.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use hive_core::domain::node_config::HiveConfigManifest;
use hive_core::domain::swarm::SwarmId;
use hive_core::domain::task::{Task, TaskStatus};

use crate::agents::LocalAgentFactory;
use crate::backends::{LocalInference, LocalTools};
use crate::embedded::Hive;
use crate::workload::Workload;

#[derive(Args)]
pub struct RunArgs {
    /// Path to workload YAML file
    #[arg(value_name = "WORKLOAD")]
    pub workload: PathBuf,

    /// Seconds to wait for each task
    #[arg(long, value_name = "SECS", default_value = "30")]
    pub timeout: u64,
}

/// One submitted (or rejected) workload task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub label: String,
    pub result: Result<Task, String>,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(task) if task.status == TaskStatus::Completed)
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// (workload name, swarm id, agents provisioned)
    pub swarms: Vec<(String, SwarmId, usize)>,
    pub tasks: Vec<TaskOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.tasks.iter().filter(|t| !t.succeeded()).count()
    }
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = HiveConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    let workload = Workload::from_yaml_file(&args.workload)?;

    let hive = Hive::initialize(
        config,
        Arc::new(LocalAgentFactory::new()),
        Arc::new(LocalInference),
        Arc::new(LocalTools),
    )
    .await?;

    let outcome = run_workload(&hive, &workload, Duration::from_secs(args.timeout)).await;
    hive.shutdown().await?;
    let report = outcome?;

    print_report(&report);
    let failures = report.failures();
    if failures > 0 {
        bail!("{} of {} task(s) did not complete", failures, report.tasks.len());
    }
    Ok(())
}

pub async fn run_workload(hive: &Hive, workload: &Workload, timeout: Duration) -> Result<RunReport> {
    let orchestrator = hive.orchestrator();
    let mut report = RunReport::default();

    let templates: HashMap<&str, _> = workload
        .templates
        .iter()
        .map(|def| {
            let id = orchestrator.create_swarm_template(&def.name, &def.description, def.agents.clone());
            (def.name.as_str(), id)
        })
        .collect();

    let mut swarm_ids: HashMap<&str, SwarmId> = HashMap::new();
    for def in &workload.swarms {
        let template_id = templates
            .get(def.template.as_str())
            .copied()
            .with_context(|| format!("Unknown template '{}'", def.template))?;
        let swarm_id = orchestrator
            .instantiate_swarm(template_id, &def.name, def.description.as_deref())
            .await
            .with_context(|| format!("Failed to instantiate swarm '{}'", def.name))?;
        let agents = orchestrator
            .get_swarm(swarm_id)
            .map(|info| info.agents.len())
            .unwrap_or(0);
        swarm_ids.insert(def.name.as_str(), swarm_id);
        report.swarms.push((def.name.clone(), swarm_id, agents));
    }

    let manager = hive.task_manager();
    let mut submitted = Vec::new();
    for (index, def) in workload.tasks.iter().enumerate() {
        let label = format!("#{} {}", index + 1, def.task_type);
        let mut params = def.params.clone();
        if let Some(name) = &def.swarm {
            let swarm_id = swarm_ids
                .get(name.as_str())
                .with_context(|| format!("Unknown swarm '{}'", name))?;
            params.insert("swarmId".to_string(), serde_json::json!(swarm_id.to_string()));
        }

        match manager.create_task(&def.task_type, params) {
            Ok(task_id) => {
                info!(task_id = %task_id, label = %label, "Task submitted");
                submitted.push((label, task_id));
            }
            Err(e) => {
                warn!(label = %label, "Task rejected: {}", e);
                report.tasks.push(TaskOutcome {
                    label,
                    result: Err(e.to_string()),
                });
            }
        }
    }

    for (label, task_id) in submitted {
        let result = manager
            .wait_for_task(task_id, timeout)
            .await
            .map_err(|e| e.to_string());
        report.tasks.push(TaskOutcome { label, result });
    }
    Ok(report)
}

fn print_report(report: &RunReport) {
    if !report.swarms.is_empty() {
        println!("{}", "Swarms:".bold());
        for (name, id, agents) in &report.swarms {
            println!("  {} {} ({} agents)", name.bold(), id.to_string().dimmed(), agents);
        }
        println!();
    }

    println!("{}", "Tasks:".bold());
    for outcome in &report.tasks {
        match &outcome.result {
            Ok(task) if task.status == TaskStatus::Completed => {
                let result = task
                    .result
                    .as_ref()
                    .and_then(|r| serde_json::to_string(r).ok())
                    .unwrap_or_default();
                println!("  {} {} {}", "✓".green(), outcome.label, result.dimmed());
            }
            Ok(task) => println!(
                "  {} {} {} {}",
                "✗".red(),
                outcome.label,
                task.status.to_string().red(),
                task.error.as_deref().unwrap_or("")
            ),
            Err(e) => println!("  {} {} {}", "✗".red(), outcome.label, e.red()),
        }
    }
    println!();

    let failures = report.failures();
    let summary = format!(
        "{} completed, {} failed",
        report.tasks.len() - failures,
        failures
    );
    if failures == 0 {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
}
