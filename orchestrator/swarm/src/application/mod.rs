// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Layer
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Swarm use cases over the registry and agent factory

pub mod registry;
pub mod orchestrator;
pub mod task_handler;

pub use orchestrator::SwarmOrchestrator;
pub use registry::SwarmRegistry;
pub use task_handler::SwarmTaskHandler;
