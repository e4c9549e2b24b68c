// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Aggregates
//!
//! - [`Swarm`] - membership record owned by the registry.
//! - [`SwarmTemplate`] - reusable recipe of agent specs.
//! - [`SwarmInstance`] - provenance of a swarm spawned from a template.
//! - [`SwarmInfo`] - read model merging an instance with live membership.
//!
//! [`SwarmId`] and [`TemplateId`] are defined in `hive_core` so that events
//! can carry them.

use chrono::{DateTime, Utc};
use hive_core::domain::agent::{AgentError, AgentId, AgentParams};
use hive_core::domain::swarm::{SwarmId, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Aggregate root for a group of coordinated agents.
///
/// # Invariants
///
/// - `agents.len() <= max_agents_per_swarm`, `tasks.len() <= max_tasks_per_swarm`.
/// - Every membership mutation bumps `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swarm {
    pub id: SwarmId,
    pub name: String,
    pub description: String,
    pub agents: HashSet<AgentId>,
    /// Ids of swarm tasks assigned to this swarm.
    pub tasks: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Swarm {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SwarmId::new(),
            name: name.into(),
            description: description.into(),
            agents: HashSet::new(),
            tasks: HashSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One agent to spawn when a template is instantiated.
///
/// Parsing is lenient: a spec with an empty `type` or `name` is accepted here
/// and skipped (with a warning) at instantiation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentTemplateSpec {
    #[serde(rename = "type", default)]
    pub agent_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: AgentParams,
}

impl AgentTemplateSpec {
    pub fn new(agent_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            name: name.into(),
            params: AgentParams::new(),
        }
    }

    pub fn with_params(mut self, params: AgentParams) -> Self {
        self.params = params;
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.agent_type.trim().is_empty() && !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmTemplate {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub agent_specs: Vec<AgentTemplateSpec>,
    pub created_at: DateTime<Utc>,
}

/// A swarm spawned from a template. Shares its id with the registry swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmInstance {
    pub id: SwarmId,
    pub template_id: TemplateId,
    pub name: String,
    pub description: String,
    /// Agents provisioned for this instance, in spawn order.
    pub agent_ids: Vec<AgentId>,
    pub created_at: DateTime<Utc>,
}

/// Instance provenance plus live registry membership, built on each read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmInfo {
    pub id: SwarmId,
    pub template_id: TemplateId,
    pub name: String,
    pub description: String,
    pub agent_ids: Vec<AgentId>,
    pub agents: HashSet<AgentId>,
    pub tasks: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwarmInfo {
    pub fn from_parts(instance: &SwarmInstance, swarm: &Swarm) -> Self {
        Self {
            id: instance.id,
            template_id: instance.template_id,
            name: instance.name.clone(),
            description: instance.description.clone(),
            agent_ids: instance.agent_ids.clone(),
            agents: swarm.agents.clone(),
            tasks: swarm.tasks.clone(),
            created_at: instance.created_at,
            updated_at: swarm.updated_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Swarm {0} not found")]
    SwarmNotFound(SwarmId),

    #[error("Agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("Swarm template {0} not found")]
    TemplateNotFound(TemplateId),

    #[error("Swarm instance {0} not found")]
    InstanceNotFound(SwarmId),

    #[error("Agent {agent_id} is not a member of swarm {swarm_id}")]
    AgentNotInSwarm { agent_id: AgentId, swarm_id: SwarmId },

    #[error("Task '{task_id}' is not assigned to swarm {swarm_id}")]
    TaskNotInSwarm { task_id: String, swarm_id: SwarmId },

    #[error("Agent {0} is already registered")]
    AgentAlreadyRegistered(AgentId),

    #[error("Swarm {swarm_id} already has the maximum of {max} agents")]
    SwarmAtAgentCapacity { swarm_id: SwarmId, max: usize },

    #[error("Agent {agent_id} already belongs to the maximum of {max} swarms")]
    AgentAtSwarmCapacity { agent_id: AgentId, max: usize },

    #[error("Swarm {swarm_id} already holds the maximum of {max} tasks")]
    SwarmAtTaskCapacity { swarm_id: SwarmId, max: usize },

    #[error("Swarm limit of {0} reached")]
    SwarmLimitReached(usize),

    #[error("Swarm {0} has no agents")]
    EmptySwarm(SwarmId),

    #[error("Agent provisioning failed: {0}")]
    AgentProvisioning(#[from] AgentError),
}
