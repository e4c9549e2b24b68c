// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Embedded service container.
//!
//! Wires the registry, orchestrator and task manager in-process around one
//! event bus, installs the built-in handlers plus the `swarm` handler, and
//! starts the worker pool.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use hive_core::{
    application::{
        handlers::{register_builtin_handlers, InferenceBackend, ToolExecutor},
        task_manager::TaskManager,
    },
    domain::{agent::AgentFactory, node_config::HiveConfigManifest},
    infrastructure::event_bus::EventBus,
};
use hive_swarm::application::{SwarmOrchestrator, SwarmRegistry, SwarmTaskHandler};

pub struct Hive {
    config: HiveConfigManifest,
    event_bus: Arc<EventBus>,
    registry: Arc<SwarmRegistry>,
    orchestrator: Arc<SwarmOrchestrator>,
    task_manager: Arc<TaskManager>,
}

impl Hive {
    pub async fn initialize(
        config: HiveConfigManifest,
        factory: Arc<dyn AgentFactory>,
        backend: Arc<dyn InferenceBackend>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let event_bus = Arc::new(EventBus::with_default_capacity());
        let registry = Arc::new(SwarmRegistry::new(config.spec.swarm.clone()));
        let orchestrator = Arc::new(SwarmOrchestrator::new(
            registry.clone(),
            factory,
            event_bus.clone(),
        ));
        let task_manager = Arc::new(TaskManager::new(config.spec.tasks.clone(), event_bus.clone()));

        register_builtin_handlers(&task_manager, backend, tools);
        task_manager.register_task_handler("swarm", Arc::new(SwarmTaskHandler::new(orchestrator.clone())));
        task_manager
            .start()
            .await
            .context("Failed to start task manager")?;

        info!(node = %config.metadata.name, "Hive initialized");
        Ok(Self {
            config,
            event_bus,
            registry,
            orchestrator,
            task_manager,
        })
    }

    pub fn config(&self) -> &HiveConfigManifest {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn registry(&self) -> &Arc<SwarmRegistry> {
        &self.registry
    }

    pub fn orchestrator(&self) -> &Arc<SwarmOrchestrator> {
        &self.orchestrator
    }

    pub fn task_manager(&self) -> &Arc<TaskManager> {
        &self.task_manager
    }

    /// Stop accepting tasks, drain the workers, then tear down every swarm.
    pub async fn shutdown(&self) -> Result<()> {
        if self.task_manager.is_running() {
            self.task_manager
                .stop()
                .await
                .context("Failed to stop task manager")?;
        }
        self.orchestrator.shutdown().await;
        info!("Hive shut down");
        Ok(())
    }
}
