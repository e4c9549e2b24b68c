// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Orchestrator
//!
//! Template-driven swarm lifecycle on top of the [`SwarmRegistry`].
//!
//! The orchestrator owns templates and instances; membership (agents, tasks,
//! `updated_at`) is always read back from the registry and never cached here.
//!
//! ## Provisioning
//!
//! Each agent goes through `create → register → start → join`. A failure at
//! any step rolls that agent back and, during instantiation, is logged and
//! skipped: a swarm may come up with fewer agents than its template lists.
//!
//! ## Locking
//!
//! Templates and instances sit behind `parking_lot` mutexes. When both
//! orchestrator and registry state are needed the orchestrator lock is taken
//! first. No lock is held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use hive_core::domain::agent::{Agent, AgentFactory, AgentId, AgentParams};
use hive_core::domain::events::SwarmEvent;
use hive_core::domain::swarm::{SwarmId, SwarmTask, TemplateId};
use hive_core::infrastructure::event_bus::EventBus;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::application::registry::SwarmRegistry;
use crate::domain::{AgentTemplateSpec, SwarmError, SwarmInfo, SwarmInstance, SwarmTemplate};

pub struct SwarmOrchestrator {
    registry: Arc<SwarmRegistry>,
    factory: Arc<dyn AgentFactory>,
    event_bus: Arc<EventBus>,
    templates: Mutex<HashMap<TemplateId, SwarmTemplate>>,
    instances: Mutex<HashMap<SwarmId, SwarmInstance>>,
}

impl SwarmOrchestrator {
    pub fn new(
        registry: Arc<SwarmRegistry>,
        factory: Arc<dyn AgentFactory>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            factory,
            event_bus,
            templates: Mutex::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SwarmRegistry> {
        &self.registry
    }

    pub fn create_swarm_template(
        &self,
        name: &str,
        description: &str,
        agent_specs: Vec<AgentTemplateSpec>,
    ) -> TemplateId {
        let template = SwarmTemplate {
            id: TemplateId::new(),
            name: name.to_string(),
            description: description.to_string(),
            agent_specs,
            created_at: Utc::now(),
        };
        let template_id = template.id;
        let spec_count = template.agent_specs.len();
        self.templates.lock().insert(template_id, template);

        info!(template_id = %template_id, name = %name, agents = spec_count, "Swarm template created");
        template_id
    }

    /// Existing instances of the template are unaffected.
    pub fn delete_swarm_template(&self, template_id: TemplateId) -> Result<(), SwarmError> {
        self.templates
            .lock()
            .remove(&template_id)
            .ok_or(SwarmError::TemplateNotFound(template_id))?;
        info!(template_id = %template_id, "Swarm template deleted");
        Ok(())
    }

    pub fn get_template(&self, template_id: TemplateId) -> Option<SwarmTemplate> {
        self.templates.lock().get(&template_id).cloned()
    }

    pub fn list_templates(&self) -> Vec<SwarmTemplate> {
        let mut templates: Vec<SwarmTemplate> = self.templates.lock().values().cloned().collect();
        templates.sort_by_key(|t| t.created_at);
        templates
    }

    /// Spawn a swarm from a template.
    ///
    /// The swarm exists as soon as this returns `Ok`, even if none of its
    /// agents could be provisioned.
    pub async fn instantiate_swarm(
        &self,
        template_id: TemplateId,
        name: &str,
        description: Option<&str>,
    ) -> Result<SwarmId, SwarmError> {
        let template = self
            .get_template(template_id)
            .ok_or(SwarmError::TemplateNotFound(template_id))?;
        let description = description.unwrap_or(&template.description);
        let max_swarms = self.registry.config().max_swarms;

        // Limit check and reservation under one lock.
        let swarm_id = {
            let mut instances = self.instances.lock();
            if instances.len() >= max_swarms {
                warn!(template_id = %template_id, max_swarms, "Refusing to instantiate swarm");
                return Err(SwarmError::SwarmLimitReached(max_swarms));
            }
            let swarm_id = self.registry.create_swarm(name, description, &[]);
            instances.insert(
                swarm_id,
                SwarmInstance {
                    id: swarm_id,
                    template_id,
                    name: name.to_string(),
                    description: description.to_string(),
                    agent_ids: Vec::new(),
                    created_at: Utc::now(),
                },
            );
            swarm_id
        };

        let mut provisioned = 0usize;
        for (index, spec) in template.agent_specs.iter().enumerate() {
            if !spec.is_complete() {
                warn!(
                    swarm_id = %swarm_id,
                    spec_index = index,
                    "Skipping agent spec without type or name"
                );
                continue;
            }

            match self
                .provision_agent(&spec.agent_type, &spec.name, &spec.params, swarm_id)
                .await
            {
                Ok(agent) => {
                    if self.record_agent(swarm_id, agent.id()) {
                        provisioned += 1;
                    } else {
                        self.roll_back(&agent).await;
                    }
                }
                Err(e) => warn!(
                    swarm_id = %swarm_id,
                    agent_type = %spec.agent_type,
                    agent_name = %spec.name,
                    "Failed to provision agent: {}",
                    e
                ),
            }
        }

        info!(
            swarm_id = %swarm_id,
            template_id = %template_id,
            agents = provisioned,
            requested = template.agent_specs.len(),
            "Swarm instantiated"
        );
        self.event_bus.publish_swarm_event(SwarmEvent::SwarmInstantiated {
            swarm_id,
            template_id,
            agent_count: provisioned,
            instantiated_at: Utc::now(),
        });
        Ok(swarm_id)
    }

    /// Stop the instance's agents, delete the swarm, then release the agents.
    ///
    /// The instance record goes first: an agent still being provisioned for
    /// this swarm can no longer be recorded and is rolled back by its
    /// provisioner.
    pub async fn destroy_swarm(&self, swarm_id: SwarmId) -> Result<(), SwarmError> {
        let agent_ids = self
            .instances
            .lock()
            .remove(&swarm_id)
            .map(|instance| instance.agent_ids)
            .ok_or(SwarmError::InstanceNotFound(swarm_id))?;

        for agent_id in &agent_ids {
            let Some(agent) = self.registry.get_agent(agent_id) else {
                continue;
            };
            if let Err(e) = agent.stop().await {
                warn!(swarm_id = %swarm_id, agent_id = %agent_id, "Failed to stop agent: {}", e);
            }
        }

        if let Err(e) = self.registry.delete_swarm(swarm_id) {
            warn!(swarm_id = %swarm_id, "Swarm already gone from registry: {}", e);
        }
        for agent_id in &agent_ids {
            if let Err(e) = self.registry.unregister_agent(agent_id) {
                debug!(agent_id = %agent_id, "Agent already unregistered: {}", e);
            }
        }

        info!(swarm_id = %swarm_id, agents = agent_ids.len(), "Swarm destroyed");
        self.event_bus.publish_swarm_event(SwarmEvent::SwarmDestroyed {
            swarm_id,
            destroyed_at: Utc::now(),
        });
        Ok(())
    }

    /// Provision one more agent into a live instance.
    pub async fn add_agent_to_swarm(
        &self,
        agent_type: &str,
        name: &str,
        swarm_id: SwarmId,
        params: &AgentParams,
    ) -> Result<AgentId, SwarmError> {
        self.require_instance(swarm_id)?;

        let agent = self
            .provision_agent(agent_type, name, params, swarm_id)
            .await
            .inspect_err(|e| {
                warn!(swarm_id = %swarm_id, agent_type = %agent_type, "Failed to add agent: {}", e)
            })?;
        let agent_id = agent.id().clone();
        if !self.record_agent(swarm_id, &agent_id) {
            self.roll_back(&agent).await;
            return Err(SwarmError::InstanceNotFound(swarm_id));
        }

        info!(swarm_id = %swarm_id, agent_id = %agent_id, "Agent joined swarm");
        self.event_bus.publish_swarm_event(SwarmEvent::AgentJoined {
            swarm_id,
            agent_id: agent_id.clone(),
            joined_at: Utc::now(),
        });
        Ok(agent_id)
    }

    /// Detach an agent and stop it. Agents this instance spawned are also
    /// unregistered.
    pub async fn remove_agent_from_swarm(
        &self,
        agent_id: &AgentId,
        swarm_id: SwarmId,
    ) -> Result<(), SwarmError> {
        self.require_instance(swarm_id)?;
        self.registry.remove_agent_from_swarm(agent_id, swarm_id)?;

        if let Some(agent) = self.registry.get_agent(agent_id) {
            if let Err(e) = agent.stop().await {
                warn!(swarm_id = %swarm_id, agent_id = %agent_id, "Failed to stop agent: {}", e);
            }
        }

        let spawned_here = {
            let mut instances = self.instances.lock();
            match instances.get_mut(&swarm_id) {
                Some(instance) => {
                    let before = instance.agent_ids.len();
                    instance.agent_ids.retain(|id| id != agent_id);
                    instance.agent_ids.len() != before
                }
                None => false,
            }
        };
        if spawned_here {
            if let Err(e) = self.registry.unregister_agent(agent_id) {
                debug!(agent_id = %agent_id, "Agent already unregistered: {}", e);
            }
        }

        info!(swarm_id = %swarm_id, agent_id = %agent_id, "Agent left swarm");
        self.event_bus.publish_swarm_event(SwarmEvent::AgentLeft {
            swarm_id,
            agent_id: agent_id.clone(),
            left_at: Utc::now(),
        });
        Ok(())
    }

    /// Register `task` with the swarm and hand it to every member.
    ///
    /// Returns how many agents accepted the task.
    pub async fn assign_task_to_swarm(
        &self,
        task: &SwarmTask,
        swarm_id: SwarmId,
    ) -> Result<usize, SwarmError> {
        let members = self.registry.get_swarm_agents(swarm_id)?;
        if members.is_empty() {
            return Err(SwarmError::EmptySwarm(swarm_id));
        }
        self.registry.add_task_to_swarm(task.id(), swarm_id)?;

        let agents: Vec<Arc<dyn Agent>> = members
            .iter()
            .filter_map(|id| self.registry.get_agent(id))
            .collect();
        let outcomes = join_all(agents.iter().map(|agent| agent.add_task(task))).await;

        let mut delivered = 0usize;
        for (agent, outcome) in agents.iter().zip(outcomes) {
            match outcome {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    swarm_id = %swarm_id,
                    agent_id = %agent.id(),
                    swarm_task_id = %task.id(),
                    "Agent rejected task: {}",
                    e
                ),
            }
        }

        info!(swarm_id = %swarm_id, swarm_task_id = %task.id(), delivered, "Task assigned to swarm");
        self.event_bus.publish_swarm_event(SwarmEvent::TaskAssigned {
            swarm_id,
            swarm_task_id: task.id().to_string(),
            delivered_to: delivered,
            assigned_at: Utc::now(),
        });
        Ok(delivered)
    }

    pub fn get_swarm(&self, swarm_id: SwarmId) -> Option<SwarmInfo> {
        let instances = self.instances.lock();
        let instance = instances.get(&swarm_id)?;
        let swarm = self.registry.get_swarm(swarm_id)?;
        Some(SwarmInfo::from_parts(instance, &swarm))
    }

    pub fn get_swarms(&self) -> Vec<SwarmInfo> {
        let instances = self.instances.lock();
        let mut infos: Vec<SwarmInfo> = instances
            .values()
            .filter_map(|instance| {
                self.registry
                    .get_swarm(instance.id)
                    .map(|swarm| SwarmInfo::from_parts(instance, &swarm))
            })
            .collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Destroy every live instance.
    pub async fn shutdown(&self) {
        let swarm_ids: Vec<SwarmId> = self.instances.lock().keys().copied().collect();
        for swarm_id in swarm_ids {
            if let Err(e) = self.destroy_swarm(swarm_id).await {
                warn!(swarm_id = %swarm_id, "Failed to destroy swarm during shutdown: {}", e);
            }
        }
        info!("Swarm orchestrator shut down");
    }

    fn require_instance(&self, swarm_id: SwarmId) -> Result<(), SwarmError> {
        if self.instances.lock().contains_key(&swarm_id) {
            Ok(())
        } else {
            Err(SwarmError::InstanceNotFound(swarm_id))
        }
    }

    /// Append to the instance's spawn list. False if the instance is gone.
    fn record_agent(&self, swarm_id: SwarmId, agent_id: &AgentId) -> bool {
        match self.instances.lock().get_mut(&swarm_id) {
            Some(instance) => {
                instance.agent_ids.push(agent_id.clone());
                true
            }
            None => false,
        }
    }

    async fn provision_agent(
        &self,
        agent_type: &str,
        name: &str,
        params: &AgentParams,
        swarm_id: SwarmId,
    ) -> Result<Arc<dyn Agent>, SwarmError> {
        let outcome = self.try_provision(agent_type, name, params, swarm_id).await;
        match &outcome {
            Ok(agent) => {
                metrics::counter!("hive_agents_provisioned_total").increment(1);
                debug!(swarm_id = %swarm_id, agent_id = %agent.id(), agent_type = %agent_type, "Agent provisioned");
            }
            Err(_) => metrics::counter!("hive_agent_provisioning_failures_total").increment(1),
        }
        outcome
    }

    async fn try_provision(
        &self,
        agent_type: &str,
        name: &str,
        params: &AgentParams,
        swarm_id: SwarmId,
    ) -> Result<Arc<dyn Agent>, SwarmError> {
        let agent = self.factory.create_agent(agent_type, name, params).await?;
        let agent_id = agent.id().clone();
        self.registry.register_agent(Arc::clone(&agent))?;

        if let Err(e) = agent.start().await {
            if let Err(e) = self.registry.unregister_agent(&agent_id) {
                debug!(agent_id = %agent_id, "Agent already unregistered: {}", e);
            }
            return Err(e.into());
        }

        if let Err(e) = self.registry.add_agent_to_swarm(&agent_id, swarm_id) {
            self.roll_back(&agent).await;
            return Err(e);
        }
        Ok(agent)
    }

    async fn roll_back(&self, agent: &Arc<dyn Agent>) {
        let agent_id = agent.id();
        if let Err(e) = agent.stop().await {
            warn!(agent_id = %agent_id, "Failed to stop agent during rollback: {}", e);
        }
        if let Err(e) = self.registry.unregister_agent(agent_id) {
            debug!(agent_id = %agent_id, "Agent already unregistered: {}", e);
        }
    }
}
