// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hive CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Composition root, local agents and backends, CLI commands

pub mod agents;
pub mod backends;
pub mod commands;
pub mod embedded;
pub mod workload;
