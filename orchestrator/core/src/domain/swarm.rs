// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared swarm identifiers and the swarm-task payload.
//!
//! The swarm aggregates themselves live in the `hive-orchestrator-swarm`
//! crate; the id and payload types are defined here so that events and
//! agents can refer to them without depending on that crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a swarm (group of coordinated agents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwarmId(pub Uuid);

impl SwarmId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for SwarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SwarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a swarm template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub Uuid);

impl TemplateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwarmTaskError {
    #[error("Swarm task payload must be a JSON object")]
    NotAnObject,

    #[error("Swarm task payload requires a non-empty string `id` field")]
    MissingId,
}

/// Opaque work payload forwarded to member agents.
///
/// The only structural requirement is a string `id`, which the registry uses
/// as the key in a swarm's task set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct SwarmTask {
    id: String,
    payload: serde_json::Map<String, serde_json::Value>,
}

impl SwarmTask {
    pub fn from_value(value: serde_json::Value) -> Result<Self, SwarmTaskError> {
        let serde_json::Value::Object(payload) = value else {
            return Err(SwarmTaskError::NotAnObject);
        };
        let id = match payload.get("id") {
            Some(serde_json::Value::String(id)) if !id.is_empty() => id.clone(),
            _ => return Err(SwarmTaskError::MissingId),
        };
        Ok(Self { id, payload })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The full payload, `id` included.
    pub fn payload(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.payload
    }
}

impl TryFrom<serde_json::Value> for SwarmTask {
    type Error = SwarmTaskError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<SwarmTask> for serde_json::Value {
    fn from(task: SwarmTask) -> Self {
        serde_json::Value::Object(task.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_swarm_task_requires_id() {
        assert_eq!(
            SwarmTask::from_value(json!({"prompt": "hi"})).unwrap_err(),
            SwarmTaskError::MissingId
        );
        assert_eq!(
            SwarmTask::from_value(json!({"id": 7})).unwrap_err(),
            SwarmTaskError::MissingId
        );
        assert_eq!(
            SwarmTask::from_value(json!(["id"])).unwrap_err(),
            SwarmTaskError::NotAnObject
        );
    }

    #[test]
    fn test_swarm_task_keeps_payload() {
        let task = SwarmTask::from_value(json!({"id": "t-1", "goal": "map the repo"})).unwrap();
        assert_eq!(task.id(), "t-1");
        assert_eq!(task.payload()["goal"], "map the repo");

        let parsed: SwarmTask = serde_json::from_value(json!({"id": "t-2"})).unwrap();
        assert_eq!(parsed.id(), "t-2");
        assert!(serde_json::from_value::<SwarmTask>(json!({})).is_err());
    }

    #[test]
    fn test_swarm_id_parse() {
        let id = SwarmId::new();
        assert_eq!(SwarmId::parse(&id.to_string()).unwrap(), id);
        assert!(SwarmId::parse("not-a-uuid").is_err());
    }
}
