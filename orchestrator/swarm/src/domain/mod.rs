// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure domain types for multi-agent coordination. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`swarm`] | `Swarm`, `SwarmTemplate`, `SwarmInstance`, `SwarmInfo`, `SwarmError` |

pub mod swarm;

pub use swarm::*;
pub use hive_core::domain::swarm::{SwarmId, SwarmTask, TemplateId};
