// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Capability Contracts
//!
//! The orchestrator never looks inside an agent. It holds an
//! `Arc<dyn Agent>` handle plus the agent's [`AgentId`] and drives it through
//! four capabilities: `start`, `stop`, `receive_message` and `add_task`.
//!
//! Agents are produced by an external [`AgentFactory`] from a type name.
//!
//! | Hook | Called by | When |
//! |------|-----------|------|
//! | `start` | `SwarmOrchestrator` | after the agent is inserted into the registry |
//! | `stop` | `SwarmOrchestrator` | before the agent is removed from the registry |
//! | `receive_message` | `SwarmRegistry::broadcast_to_swarm` | per member, failures logged |
//! | `add_task` | `SwarmOrchestrator::assign_task_to_swarm` | once per member agent |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::swarm::SwarmTask;

/// Free-form construction parameters handed to an [`AgentFactory`].
pub type AgentParams = serde_json::Map<String, serde_json::Value>;

/// Stable, process-unique agent identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random id of the form `agent-<uuid>`.
    pub fn generate() -> Self {
        Self(format!("agent-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Message delivered to every member of a swarm during a broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Message kind, e.g. `"status"` or `"instruction"`.
    pub kind: String,
    pub payload: serde_json::Value,
}

impl AgentMessage {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Unknown agent type: {0}")]
    UnknownType(String),

    #[error("Agent construction failed: {0}")]
    Construction(String),

    #[error("Agent lifecycle hook failed: {0}")]
    Lifecycle(String),

    #[error("Delivery to agent failed: {0}")]
    Delivery(String),
}

/// Externally implemented worker capability.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &AgentId;

    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), AgentError>;

    async fn stop(&self) -> Result<(), AgentError>;

    async fn receive_message(&self, message: &AgentMessage) -> Result<(), AgentError>;

    async fn add_task(&self, task: &SwarmTask) -> Result<(), AgentError>;
}

/// Builds agents from a type name.
///
/// Failure (unknown type, construction error) is reported as an `Err` value;
/// implementations must not panic.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    async fn create_agent(
        &self,
        agent_type: &str,
        name: &str,
        params: &AgentParams,
    ) -> Result<Arc<dyn Agent>, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_generate_is_unique() {
        let a = AgentId::generate();
        let b = AgentId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("agent-"));
    }

    #[test]
    fn test_agent_id_serializes_as_plain_string() {
        let id = AgentId::new("researcher-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"researcher-1\"");
        let parsed: AgentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
