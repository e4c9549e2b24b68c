// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hive core
//!
//! Agent capability contracts, the task aggregate and its state machine,
//! configuration, domain events and the Task Manager worker pool.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Shared domain plus task execution; swarm coordination lives
//!   in `hive_swarm` and builds on the types exported here.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
