// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Handler Contract
//!
//! A handler executes one task type. The task manager keeps a dispatch table
//! keyed by `task_type` and invokes the matching handler from a worker.
//! Handlers report failure through [`TaskHandlerError`]; the worker records
//! it as the task's terminal `failed` state.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::task::{Task, TaskParams};

#[derive(Debug, Error)]
pub enum TaskHandlerError {
    #[error("Missing required parameter '{0}'")]
    MissingParam(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Delegation failed: {0}")]
    Delegation(String),
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &Task) -> Result<TaskParams, TaskHandlerError>;
}

/// Adapter turning a synchronous closure into a [`TaskHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> TaskHandler for FnHandler<F>
where
    F: Fn(&Task) -> Result<TaskParams, TaskHandlerError> + Send + Sync + 'static,
{
    async fn handle(&self, task: &Task) -> Result<TaskParams, TaskHandlerError> {
        (self.0)(task)
    }
}

pub fn handler_fn<F>(f: F) -> Arc<dyn TaskHandler>
where
    F: Fn(&Task) -> Result<TaskParams, TaskHandlerError> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Fetch a required, non-empty string parameter.
pub fn required_str<'a>(params: &'a TaskParams, key: &str) -> Result<&'a str, TaskHandlerError> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Err(TaskHandlerError::MissingParam(key.to_string())),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
            Err(TaskHandlerError::MissingParam(key.to_string()))
        }
        Some(serde_json::Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(TaskHandlerError::InvalidParam {
            name: key.to_string(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}

/// Fetch a required parameter of any JSON type.
pub fn required_value<'a>(
    params: &'a TaskParams,
    key: &str,
) -> Result<&'a serde_json::Value, TaskHandlerError> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Err(TaskHandlerError::MissingParam(key.to_string())),
        Some(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> TaskParams {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_str() {
        let p = params(json!({"prompt": "hello", "blank": "  ", "n": 3, "nothing": null}));
        assert_eq!(required_str(&p, "prompt").unwrap(), "hello");
        assert!(matches!(required_str(&p, "blank"), Err(TaskHandlerError::MissingParam(_))));
        assert!(matches!(required_str(&p, "absent"), Err(TaskHandlerError::MissingParam(_))));
        assert!(matches!(required_str(&p, "nothing"), Err(TaskHandlerError::MissingParam(_))));
        assert!(matches!(required_str(&p, "n"), Err(TaskHandlerError::InvalidParam { .. })));
    }

    #[test]
    fn test_handler_fn_adapter() {
        let handler = handler_fn(|task: &Task| Ok(task.params.clone()));
        let task = Task::new("echo", params(json!({"x": 1})));
        let out = tokio_test::block_on(handler.handle(&task)).unwrap();
        assert_eq!(out["x"], 1);
    }
}
