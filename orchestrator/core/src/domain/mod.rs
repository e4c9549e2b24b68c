// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Entities, value objects and capability traits

pub mod agent;
pub mod swarm;
pub mod task;
pub mod handler;
pub mod events;
pub mod node_config;
