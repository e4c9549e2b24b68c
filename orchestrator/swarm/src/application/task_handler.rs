// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The `swarm` task type: hands a swarm-task payload to every member of a
//! swarm through the [`SwarmOrchestrator`].
//!
//! Required params: `swarmId` (UUID string) and `task` (object with a string
//! `id`). The result carries `swarmId`, `taskId` and `deliveredTo`.

use std::sync::Arc;

use async_trait::async_trait;
use hive_core::domain::handler::{required_str, required_value, TaskHandler, TaskHandlerError};
use hive_core::domain::swarm::{SwarmId, SwarmTask};
use hive_core::domain::task::{Task, TaskParams};
use serde_json::json;

use crate::application::orchestrator::SwarmOrchestrator;

pub struct SwarmTaskHandler {
    orchestrator: Arc<SwarmOrchestrator>,
}

impl SwarmTaskHandler {
    pub fn new(orchestrator: Arc<SwarmOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl TaskHandler for SwarmTaskHandler {
    async fn handle(&self, task: &Task) -> Result<TaskParams, TaskHandlerError> {
        let raw_id = required_str(&task.params, "swarmId")?;
        let swarm_id = SwarmId::parse(raw_id).map_err(|e| TaskHandlerError::InvalidParam {
            name: "swarmId".to_string(),
            reason: e.to_string(),
        })?;
        let swarm_task = SwarmTask::from_value(required_value(&task.params, "task")?.clone())
            .map_err(|e| TaskHandlerError::InvalidParam {
                name: "task".to_string(),
                reason: e.to_string(),
            })?;

        let delivered = self
            .orchestrator
            .assign_task_to_swarm(&swarm_task, swarm_id)
            .await
            .map_err(|e| TaskHandlerError::Delegation(e.to_string()))?;

        let mut result = TaskParams::new();
        result.insert("swarmId".to_string(), json!(swarm_id.to_string()));
        result.insert("taskId".to_string(), json!(swarm_task.id()));
        result.insert("deliveredTo".to_string(), json!(delivered));
        Ok(result)
    }
}
