// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-swarm` - Multi-Agent Coordination Crate
//!
//! Tracks which agents and swarm tasks belong to which swarms, and spawns
//! swarms from reusable templates.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Swarm`, `SwarmTemplate`, `SwarmInstance` aggregates, `SwarmError` |
//! | [`application`] | Application | `SwarmRegistry`, `SwarmOrchestrator`, the `swarm` task handler |
//!
//! ## Key Concepts
//!
//! - **Registry**: bidirectional membership indices (swarm → agents/tasks and
//!   agent/task → swarms) kept consistent under a single lock.
//! - **Orchestrator**: instantiates templates through an `AgentFactory` with
//!   best-effort provisioning; an agent that fails to come up is logged and
//!   skipped.
//!
//! Swarms are tracked in memory only.

pub mod domain;
pub mod application;

pub use domain::*;
