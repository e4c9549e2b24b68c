// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::swarm::{SwarmId, TemplateId};
use crate::domain::task::TaskId;

/// Task life-cycle events published by the task manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskEvent {
    TaskCreated {
        task_id: TaskId,
        task_type: String,
        created_at: DateTime<Utc>,
    },
    TaskStarted {
        task_id: TaskId,
        started_at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: TaskId,
        completed_at: DateTime<Utc>,
    },
    TaskFailed {
        task_id: TaskId,
        error: String,
        failed_at: DateTime<Utc>,
    },
    TaskCancelled {
        task_id: TaskId,
        cancelled_at: DateTime<Utc>,
    },
}

impl TaskEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::TaskCreated { task_id, .. }
            | TaskEvent::TaskStarted { task_id, .. }
            | TaskEvent::TaskCompleted { task_id, .. }
            | TaskEvent::TaskFailed { task_id, .. }
            | TaskEvent::TaskCancelled { task_id, .. } => *task_id,
        }
    }

    /// True for the events that end a task's life cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::TaskCompleted { .. }
                | TaskEvent::TaskFailed { .. }
                | TaskEvent::TaskCancelled { .. }
        )
    }
}

/// Swarm coordination events published by the swarm orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwarmEvent {
    SwarmInstantiated {
        swarm_id: SwarmId,
        template_id: TemplateId,
        agent_count: usize,
        instantiated_at: DateTime<Utc>,
    },
    SwarmDestroyed {
        swarm_id: SwarmId,
        destroyed_at: DateTime<Utc>,
    },
    AgentJoined {
        swarm_id: SwarmId,
        agent_id: AgentId,
        joined_at: DateTime<Utc>,
    },
    AgentLeft {
        swarm_id: SwarmId,
        agent_id: AgentId,
        left_at: DateTime<Utc>,
    },
    TaskAssigned {
        swarm_id: SwarmId,
        swarm_task_id: String,
        delivered_to: usize,
        assigned_at: DateTime<Utc>,
    },
}
