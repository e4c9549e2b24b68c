// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Local agent types for `hive run`.
//!
//! | type | behavior |
//! |------|----------|
//! | `echo` | keeps every task and message it receives; rejects work while stopped |
//! | `logger` | logs everything at `info` and never rejects |

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use hive_core::domain::agent::{Agent, AgentError, AgentFactory, AgentId, AgentMessage, AgentParams};
use hive_core::domain::swarm::SwarmTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAgentKind {
    Echo,
    Logger,
}

impl LocalAgentKind {
    pub fn parse(agent_type: &str) -> Option<Self> {
        match agent_type {
            "echo" => Some(Self::Echo),
            "logger" => Some(Self::Logger),
            _ => None,
        }
    }
}

pub struct LocalAgent {
    id: AgentId,
    name: String,
    kind: LocalAgentKind,
    running: AtomicBool,
    inbox: Mutex<Vec<AgentMessage>>,
    tasks: Mutex<Vec<SwarmTask>>,
}

impl LocalAgent {
    pub fn new(kind: LocalAgentKind, name: &str) -> Self {
        Self {
            id: AgentId::generate(),
            name: name.to_string(),
            kind,
            running: AtomicBool::new(false),
            inbox: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> LocalAgentKind {
        self.kind
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn received_tasks(&self) -> Vec<SwarmTask> {
        self.tasks.lock().clone()
    }

    pub fn received_messages(&self) -> Vec<AgentMessage> {
        self.inbox.lock().clone()
    }

    fn ensure_running(&self) -> Result<(), AgentError> {
        if self.kind == LocalAgentKind::Echo && !self.is_running() {
            return Err(AgentError::Delivery(format!("agent '{}' is not running", self.name)));
        }
        Ok(())
    }
}

#[async_trait]
impl Agent for LocalAgent {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), AgentError> {
        self.running.store(true, Ordering::SeqCst);
        info!(agent_id = %self.id, name = %self.name, "Agent started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AgentError> {
        self.running.store(false, Ordering::SeqCst);
        info!(agent_id = %self.id, name = %self.name, "Agent stopped");
        Ok(())
    }

    async fn receive_message(&self, message: &AgentMessage) -> Result<(), AgentError> {
        self.ensure_running()?;
        if self.kind == LocalAgentKind::Logger {
            info!(agent_id = %self.id, kind = %message.kind, payload = %message.payload, "Message received");
        }
        self.inbox.lock().push(message.clone());
        Ok(())
    }

    async fn add_task(&self, task: &SwarmTask) -> Result<(), AgentError> {
        self.ensure_running()?;
        info!(agent_id = %self.id, name = %self.name, swarm_task_id = %task.id(), "Task received");
        self.tasks.lock().push(task.clone());
        Ok(())
    }
}

/// Builds [`LocalAgent`]s and keeps a handle to each for inspection.
#[derive(Default)]
pub struct LocalAgentFactory {
    spawned: Mutex<Vec<Arc<LocalAgent>>>,
}

impl LocalAgentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&self) -> Vec<Arc<LocalAgent>> {
        self.spawned.lock().clone()
    }
}

#[async_trait]
impl AgentFactory for LocalAgentFactory {
    async fn create_agent(
        &self,
        agent_type: &str,
        name: &str,
        _params: &AgentParams,
    ) -> Result<Arc<dyn Agent>, AgentError> {
        let kind = LocalAgentKind::parse(agent_type)
            .ok_or_else(|| AgentError::UnknownType(agent_type.to_string()))?;
        let agent = Arc::new(LocalAgent::new(kind, name));
        self.spawned.lock().push(Arc::clone(&agent));
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_type_is_rejected() {
        let factory = LocalAgentFactory::new();
        let err = factory
            .create_agent("quantum", "q", &AgentParams::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::UnknownType(t) if t == "quantum"));
        assert!(factory.spawned().is_empty());
    }

    #[tokio::test]
    async fn test_echo_agent_requires_start() {
        let agent = LocalAgent::new(LocalAgentKind::Echo, "e");
        let task = SwarmTask::from_value(json!({"id": "t1"})).unwrap();
        assert!(agent.add_task(&task).await.is_err());

        agent.start().await.unwrap();
        agent.add_task(&task).await.unwrap();
        assert_eq!(agent.received_tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_logger_accepts_while_stopped() {
        let agent = LocalAgent::new(LocalAgentKind::Logger, "l");
        agent
            .receive_message(&AgentMessage::new("note", json!("hi")))
            .await
            .unwrap();
        assert_eq!(agent.received_messages().len(), 1);
    }
}
