// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod task_manager;
pub mod handlers;

// Re-export for convenience
pub use task_manager::TaskManager;
pub use handlers::{register_builtin_handlers, InferenceBackend, ToolExecutor};
