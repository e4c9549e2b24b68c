// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Built-in task handlers.
//!
//! | type       | required params          | delegates to                    |
//! |------------|--------------------------|---------------------------------|
//! | `generate` | `prompt`                 | [`InferenceBackend::generate`]  |
//! | `analyze`  | `text`                   | [`InferenceBackend::analyze`]   |
//! | `search`   | `query`                  | [`InferenceBackend::search`]    |
//! | `tool`     | `toolType`, `operation`  | [`ToolExecutor::execute`]       |
//!
//! The full parameter bag is forwarded so backends can read optional keys.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::application::task_manager::TaskManager;
use crate::domain::handler::{required_str, TaskHandler, TaskHandlerError};
use crate::domain::task::{Task, TaskParams};

/// External model inference consumed by the text handlers.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn generate(&self, prompt: &str, params: &TaskParams) -> Result<TaskParams, TaskHandlerError>;
    async fn analyze(&self, text: &str, params: &TaskParams) -> Result<TaskParams, TaskHandlerError>;
    async fn search(&self, query: &str, params: &TaskParams) -> Result<TaskParams, TaskHandlerError>;
}

/// External tool runner consumed by the `tool` handler.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        tool_type: &str,
        operation: &str,
        params: &TaskParams,
    ) -> Result<TaskParams, TaskHandlerError>;
}

pub struct GenerateHandler {
    backend: Arc<dyn InferenceBackend>,
}

impl GenerateHandler {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TaskHandler for GenerateHandler {
    async fn handle(&self, task: &Task) -> Result<TaskParams, TaskHandlerError> {
        let prompt = required_str(&task.params, "prompt")?;
        debug!(task_id = %task.id, prompt_len = prompt.len(), "Generating");
        self.backend.generate(prompt, &task.params).await
    }
}

pub struct AnalyzeHandler {
    backend: Arc<dyn InferenceBackend>,
}

impl AnalyzeHandler {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TaskHandler for AnalyzeHandler {
    async fn handle(&self, task: &Task) -> Result<TaskParams, TaskHandlerError> {
        let text = required_str(&task.params, "text")?;
        self.backend.analyze(text, &task.params).await
    }
}

pub struct SearchHandler {
    backend: Arc<dyn InferenceBackend>,
}

impl SearchHandler {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TaskHandler for SearchHandler {
    async fn handle(&self, task: &Task) -> Result<TaskParams, TaskHandlerError> {
        let query = required_str(&task.params, "query")?;
        self.backend.search(query, &task.params).await
    }
}

pub struct ToolHandler {
    tools: Arc<dyn ToolExecutor>,
}

impl ToolHandler {
    pub fn new(tools: Arc<dyn ToolExecutor>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl TaskHandler for ToolHandler {
    async fn handle(&self, task: &Task) -> Result<TaskParams, TaskHandlerError> {
        let tool_type = required_str(&task.params, "toolType")?;
        let operation = required_str(&task.params, "operation")?;
        debug!(task_id = %task.id, tool_type, operation, "Executing tool");
        self.tools.execute(tool_type, operation, &task.params).await
    }
}

/// Install `generate`, `analyze`, `search` and `tool` on `manager`.
pub fn register_builtin_handlers(
    manager: &TaskManager,
    backend: Arc<dyn InferenceBackend>,
    tools: Arc<dyn ToolExecutor>,
) {
    manager.register_task_handler("generate", Arc::new(GenerateHandler::new(Arc::clone(&backend))));
    manager.register_task_handler("analyze", Arc::new(AnalyzeHandler::new(Arc::clone(&backend))));
    manager.register_task_handler("search", Arc::new(SearchHandler::new(backend)));
    manager.register_task_handler("tool", Arc::new(ToolHandler::new(tools)));
}
