// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workload file consumed by `hive run`.
//!
//! ```yaml
//! templates:
//!   - name: crawlers
//!     description: Two echo agents
//!     agents:
//!       - { type: echo, name: crawler-1 }
//!       - { type: logger, name: audit }
//! swarms:
//!   - { name: crew, template: crawlers }
//! tasks:
//!   - { type: generate, params: { prompt: "hello" } }
//!   - { type: swarm, swarm: crew, params: { task: { id: crawl-1 } } }
//! ```
//!
//! A `swarm` entry on a task is resolved to a `swarmId` param at submit time.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use hive_core::domain::task::TaskParams;
use hive_swarm::domain::AgentTemplateSpec;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workload {
    #[serde(default)]
    pub templates: Vec<TemplateDef>,
    #[serde(default)]
    pub swarms: Vec<SwarmDef>,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agents: Vec<AgentTemplateSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmDef {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    #[serde(rename = "type")]
    pub task_type: String,
    /// Workload swarm name; becomes the `swarmId` param.
    #[serde(default)]
    pub swarm: Option<String>,
    #[serde(default)]
    pub params: TaskParams,
}

impl Workload {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workload {:?}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid workload {:?}", path))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let workload: Self = serde_yaml::from_str(yaml)?;
        workload.validate()?;
        Ok(workload)
    }

    /// Cross-reference check: unique names and resolvable references.
    pub fn validate(&self) -> Result<()> {
        let mut templates = HashSet::new();
        for template in &self.templates {
            if !templates.insert(template.name.as_str()) {
                bail!("Duplicate template name '{}'", template.name);
            }
        }

        let mut swarms = HashSet::new();
        for swarm in &self.swarms {
            if !templates.contains(swarm.template.as_str()) {
                bail!(
                    "Swarm '{}' references unknown template '{}'",
                    swarm.name,
                    swarm.template
                );
            }
            if !swarms.insert(swarm.name.as_str()) {
                bail!("Duplicate swarm name '{}'", swarm.name);
            }
        }

        for (index, task) in self.tasks.iter().enumerate() {
            if task.task_type.trim().is_empty() {
                bail!("Task #{} has no type", index + 1);
            }
            if let Some(swarm) = &task.swarm {
                if !swarms.contains(swarm.as_str()) {
                    bail!("Task #{} references unknown swarm '{}'", index + 1, swarm);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
templates:
  - name: crawlers
    agents:
      - { type: echo, name: crawler-1 }
      - { name: missing-type }
swarms:
  - { name: crew, template: crawlers }
tasks:
  - { type: analyze, params: { text: "a b c" } }
  - { type: swarm, swarm: crew, params: { task: { id: crawl-1 } } }
"#;

    #[test]
    fn test_parse_sample() {
        let workload = Workload::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(workload.templates[0].agents.len(), 2);
        assert!(!workload.templates[0].agents[1].is_complete());
        assert_eq!(workload.tasks[1].swarm.as_deref(), Some("crew"));
        assert_eq!(workload.tasks[0].params["text"], "a b c");
    }

    #[test]
    fn test_unknown_references_are_rejected() {
        let yaml = "swarms:\n  - { name: crew, template: nope }\n";
        assert!(Workload::from_yaml_str(yaml).is_err());

        let yaml = "tasks:\n  - { type: swarm, swarm: ghost }\n";
        assert!(Workload::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_empty_workload_is_valid() {
        let workload = Workload::from_yaml_str("{}").unwrap();
        assert!(workload.tasks.is_empty());
    }
}
