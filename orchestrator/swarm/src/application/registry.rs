// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Registry
//!
//! Membership bookkeeping for swarms, agents and swarm tasks.
//!
//! The registry keeps two directions of every relation:
//!
//! | Forward | Inverse |
//! |---------|---------|
//! | `Swarm::agents` | `agent_swarms[agent]` |
//! | `Swarm::tasks` | `task_swarms[task]` |
//!
//! Both sides change inside the same critical section of a single
//! `parking_lot::Mutex`, so no caller can observe one without the other.
//! Inverse entries are removed as soon as their set becomes empty.
//!
//! Mutations are synchronous. [`SwarmRegistry::broadcast_to_swarm`] snapshots
//! the member handles under the lock and delivers after releasing it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use hive_core::domain::agent::{Agent, AgentId, AgentMessage};
use hive_core::domain::node_config::SwarmConfig;
use hive_core::domain::swarm::SwarmId;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{Swarm, SwarmError};

#[derive(Default)]
struct RegistryState {
    swarms: HashMap<SwarmId, Swarm>,
    agents: HashMap<AgentId, Arc<dyn Agent>>,
    agent_swarms: HashMap<AgentId, HashSet<SwarmId>>,
    task_swarms: HashMap<String, HashSet<SwarmId>>,
}

impl RegistryState {
    fn attach_agent(
        &mut self,
        config: &SwarmConfig,
        agent_id: &AgentId,
        swarm_id: SwarmId,
    ) -> Result<(), SwarmError> {
        let swarm = self
            .swarms
            .get_mut(&swarm_id)
            .ok_or(SwarmError::SwarmNotFound(swarm_id))?;
        if !self.agents.contains_key(agent_id) {
            return Err(SwarmError::AgentNotFound(agent_id.clone()));
        }
        if swarm.agents.contains(agent_id) {
            return Ok(());
        }
        if swarm.agents.len() >= config.max_agents_per_swarm {
            return Err(SwarmError::SwarmAtAgentCapacity {
                swarm_id,
                max: config.max_agents_per_swarm,
            });
        }
        let memberships = self.agent_swarms.get(agent_id).map_or(0, HashSet::len);
        if memberships >= config.max_swarms_per_agent {
            return Err(SwarmError::AgentAtSwarmCapacity {
                agent_id: agent_id.clone(),
                max: config.max_swarms_per_agent,
            });
        }

        swarm.agents.insert(agent_id.clone());
        swarm.touch();
        self.agent_swarms
            .entry(agent_id.clone())
            .or_default()
            .insert(swarm_id);
        Ok(())
    }

    fn detach_agent(&mut self, agent_id: &AgentId, swarm_id: SwarmId) -> Result<(), SwarmError> {
        let swarm = self
            .swarms
            .get_mut(&swarm_id)
            .ok_or(SwarmError::SwarmNotFound(swarm_id))?;
        if !swarm.agents.remove(agent_id) {
            return Err(SwarmError::AgentNotInSwarm {
                agent_id: agent_id.clone(),
                swarm_id,
            });
        }
        swarm.touch();
        remove_inverse(&mut self.agent_swarms, agent_id, swarm_id);
        Ok(())
    }

    fn attach_task(
        &mut self,
        config: &SwarmConfig,
        task_id: &str,
        swarm_id: SwarmId,
    ) -> Result<(), SwarmError> {
        let swarm = self
            .swarms
            .get_mut(&swarm_id)
            .ok_or(SwarmError::SwarmNotFound(swarm_id))?;
        if swarm.tasks.contains(task_id) {
            return Ok(());
        }
        if swarm.tasks.len() >= config.max_tasks_per_swarm {
            return Err(SwarmError::SwarmAtTaskCapacity {
                swarm_id,
                max: config.max_tasks_per_swarm,
            });
        }

        swarm.tasks.insert(task_id.to_string());
        swarm.touch();
        self.task_swarms
            .entry(task_id.to_string())
            .or_default()
            .insert(swarm_id);
        Ok(())
    }

    fn detach_task(&mut self, task_id: &str, swarm_id: SwarmId) -> Result<(), SwarmError> {
        let swarm = self
            .swarms
            .get_mut(&swarm_id)
            .ok_or(SwarmError::SwarmNotFound(swarm_id))?;
        if !swarm.tasks.remove(task_id) {
            return Err(SwarmError::TaskNotInSwarm {
                task_id: task_id.to_string(),
                swarm_id,
            });
        }
        swarm.touch();
        remove_inverse(&mut self.task_swarms, task_id, swarm_id);
        Ok(())
    }
}

fn remove_inverse<K, Q>(index: &mut HashMap<K, HashSet<SwarmId>>, key: &Q, swarm_id: SwarmId)
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + ?Sized,
{
    if let Some(swarms) = index.get_mut(key) {
        swarms.remove(&swarm_id);
        if swarms.is_empty() {
            index.remove(key);
        }
    }
}

fn sorted<T: Ord>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut items: Vec<T> = items.into_iter().collect();
    items.sort();
    items
}

pub struct SwarmRegistry {
    config: SwarmConfig,
    state: Mutex<RegistryState>,
}

impl SwarmRegistry {
    pub fn new(config: SwarmConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Create a swarm and try to add each of `initial_agents` to it.
    ///
    /// An initial agent that cannot be added is logged and skipped; creation
    /// itself never fails.
    pub fn create_swarm(&self, name: &str, description: &str, initial_agents: &[AgentId]) -> SwarmId {
        let swarm = Swarm::new(name, description);
        let swarm_id = swarm.id;

        let swarm_count = {
            let mut state = self.state.lock();
            state.swarms.insert(swarm_id, swarm);
            for agent_id in initial_agents {
                if let Err(e) = state.attach_agent(&self.config, agent_id, swarm_id) {
                    warn!(swarm_id = %swarm_id, agent_id = %agent_id, "Skipping initial agent: {}", e);
                }
            }
            state.swarms.len()
        };

        metrics::gauge!("hive_swarms_active").set(swarm_count as f64);
        info!(swarm_id = %swarm_id, name = %name, "Swarm created");
        swarm_id
    }

    /// Detach every member agent and task, then erase the swarm.
    pub fn delete_swarm(&self, swarm_id: SwarmId) -> Result<(), SwarmError> {
        let swarm_count = {
            let mut state = self.state.lock();
            let swarm = state
                .swarms
                .get(&swarm_id)
                .ok_or(SwarmError::SwarmNotFound(swarm_id))?;
            let agents: Vec<AgentId> = swarm.agents.iter().cloned().collect();
            let tasks: Vec<String> = swarm.tasks.iter().cloned().collect();

            for agent_id in &agents {
                state.detach_agent(agent_id, swarm_id)?;
            }
            for task_id in &tasks {
                state.detach_task(task_id, swarm_id)?;
            }
            state.swarms.remove(&swarm_id);
            state.swarms.len()
        };

        metrics::gauge!("hive_swarms_active").set(swarm_count as f64);
        info!(swarm_id = %swarm_id, "Swarm deleted");
        Ok(())
    }

    /// Add a registered agent to a swarm. Adding an existing member is a no-op.
    pub fn add_agent_to_swarm(&self, agent_id: &AgentId, swarm_id: SwarmId) -> Result<(), SwarmError> {
        self.state.lock().attach_agent(&self.config, agent_id, swarm_id)?;
        debug!(swarm_id = %swarm_id, agent_id = %agent_id, "Agent added to swarm");
        Ok(())
    }

    pub fn remove_agent_from_swarm(&self, agent_id: &AgentId, swarm_id: SwarmId) -> Result<(), SwarmError> {
        self.state.lock().detach_agent(agent_id, swarm_id)?;
        debug!(swarm_id = %swarm_id, agent_id = %agent_id, "Agent removed from swarm");
        Ok(())
    }

    /// Record a swarm task as assigned. Re-adding the same id is a no-op.
    pub fn add_task_to_swarm(&self, task_id: &str, swarm_id: SwarmId) -> Result<(), SwarmError> {
        self.state.lock().attach_task(&self.config, task_id, swarm_id)?;
        debug!(swarm_id = %swarm_id, task_id = %task_id, "Task added to swarm");
        Ok(())
    }

    pub fn remove_task_from_swarm(&self, task_id: &str, swarm_id: SwarmId) -> Result<(), SwarmError> {
        self.state.lock().detach_task(task_id, swarm_id)?;
        debug!(swarm_id = %swarm_id, task_id = %task_id, "Task removed from swarm");
        Ok(())
    }

    pub fn register_agent(&self, agent: Arc<dyn Agent>) -> Result<(), SwarmError> {
        let agent_id = agent.id().clone();
        {
            let mut state = self.state.lock();
            if state.agents.contains_key(&agent_id) {
                return Err(SwarmError::AgentAlreadyRegistered(agent_id));
            }
            state.agents.insert(agent_id.clone(), agent);
        }
        debug!(agent_id = %agent_id, "Agent registered");
        Ok(())
    }

    /// Evict the agent from every swarm it belongs to, then forget it.
    pub fn unregister_agent(&self, agent_id: &AgentId) -> Result<(), SwarmError> {
        {
            let mut state = self.state.lock();
            if !state.agents.contains_key(agent_id) {
                return Err(SwarmError::AgentNotFound(agent_id.clone()));
            }
            let memberships: Vec<SwarmId> = state
                .agent_swarms
                .get(agent_id)
                .map(|s| s.iter().copied().collect())
                .unwrap_or_default();
            for swarm_id in memberships {
                state.detach_agent(agent_id, swarm_id)?;
            }
            state.agents.remove(agent_id);
        }
        debug!(agent_id = %agent_id, "Agent unregistered");
        Ok(())
    }

    /// Deliver `message` to every member of the swarm.
    ///
    /// Returns the number of agents that accepted the message. A failing agent
    /// is logged and skipped.
    pub async fn broadcast_to_swarm(
        &self,
        swarm_id: SwarmId,
        message: &AgentMessage,
    ) -> Result<usize, SwarmError> {
        let members: Vec<Arc<dyn Agent>> = {
            let state = self.state.lock();
            let swarm = state
                .swarms
                .get(&swarm_id)
                .ok_or(SwarmError::SwarmNotFound(swarm_id))?;
            swarm
                .agents
                .iter()
                .filter_map(|id| state.agents.get(id).cloned())
                .collect()
        };
        if members.is_empty() {
            return Err(SwarmError::EmptySwarm(swarm_id));
        }

        let outcomes = join_all(members.iter().map(|agent| agent.receive_message(message))).await;
        let mut delivered = 0;
        for (agent, outcome) in members.iter().zip(outcomes) {
            match outcome {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    swarm_id = %swarm_id,
                    agent_id = %agent.id(),
                    kind = %message.kind,
                    "Broadcast delivery failed: {}",
                    e
                ),
            }
        }

        debug!(swarm_id = %swarm_id, delivered, members = members.len(), "Broadcast complete");
        Ok(delivered)
    }

    pub fn get_swarm(&self, swarm_id: SwarmId) -> Option<Swarm> {
        self.state.lock().swarms.get(&swarm_id).cloned()
    }

    pub fn get_swarms(&self) -> Vec<Swarm> {
        let mut swarms: Vec<Swarm> = self.state.lock().swarms.values().cloned().collect();
        swarms.sort_by_key(|s| s.created_at);
        swarms
    }

    /// Swarms the agent belongs to. Empty for unknown agents.
    pub fn get_agent_swarms(&self, agent_id: &AgentId) -> Vec<SwarmId> {
        self.state
            .lock()
            .agent_swarms
            .get(agent_id)
            .map(|s| sorted(s.iter().copied()))
            .unwrap_or_default()
    }

    pub fn get_task_swarms(&self, task_id: &str) -> Vec<SwarmId> {
        self.state
            .lock()
            .task_swarms
            .get(task_id)
            .map(|s| sorted(s.iter().copied()))
            .unwrap_or_default()
    }

    pub fn get_swarm_agents(&self, swarm_id: SwarmId) -> Result<Vec<AgentId>, SwarmError> {
        self.state
            .lock()
            .swarms
            .get(&swarm_id)
            .map(|s| sorted(s.agents.iter().cloned()))
            .ok_or(SwarmError::SwarmNotFound(swarm_id))
    }

    pub fn get_swarm_tasks(&self, swarm_id: SwarmId) -> Result<Vec<String>, SwarmError> {
        self.state
            .lock()
            .swarms
            .get(&swarm_id)
            .map(|s| sorted(s.tasks.iter().cloned()))
            .ok_or(SwarmError::SwarmNotFound(swarm_id))
    }

    pub fn get_agent(&self, agent_id: &AgentId) -> Option<Arc<dyn Agent>> {
        self.state.lock().agents.get(agent_id).cloned()
    }

    pub fn agent_count(&self) -> usize {
        self.state.lock().agents.len()
    }

    pub fn swarm_count(&self) -> usize {
        self.state.lock().swarms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hive_core::domain::agent::AgentError;
    use hive_core::domain::swarm::SwarmTask;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubAgent {
        id: AgentId,
        received: AtomicUsize,
        refuse: bool,
    }

    impl StubAgent {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: AgentId::from(id),
                received: AtomicUsize::new(0),
                refuse: false,
            })
        }

        fn refusing(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: AgentId::from(id),
                received: AtomicUsize::new(0),
                refuse: true,
            })
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn id(&self) -> &AgentId {
            &self.id
        }
        fn name(&self) -> &str {
            self.id.as_str()
        }
        async fn start(&self) -> Result<(), AgentError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), AgentError> {
            Ok(())
        }
        async fn receive_message(&self, _: &AgentMessage) -> Result<(), AgentError> {
            if self.refuse {
                return Err(AgentError::Delivery("inbox closed".into()));
            }
            self.received.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn add_task(&self, _: &SwarmTask) -> Result<(), AgentError> {
            Ok(())
        }
    }

    fn registry(max_agents: usize, max_swarms_per_agent: usize, max_tasks: usize) -> SwarmRegistry {
        SwarmRegistry::new(SwarmConfig {
            max_agents_per_swarm: max_agents,
            max_swarms_per_agent,
            max_tasks_per_swarm: max_tasks,
            ..SwarmConfig::default()
        })
    }

    #[test]
    fn test_third_agent_rejected_at_capacity() {
        let registry = registry(2, 5, 5);
        let swarm = registry.create_swarm("s", "", &[]);
        for id in ["a", "b", "c"] {
            registry.register_agent(StubAgent::new(id)).unwrap();
        }

        registry.add_agent_to_swarm(&"a".into(), swarm).unwrap();
        registry.add_agent_to_swarm(&"b".into(), swarm).unwrap();
        let err = registry.add_agent_to_swarm(&"c".into(), swarm).unwrap_err();

        assert!(matches!(err, SwarmError::SwarmAtAgentCapacity { max: 2, .. }));
        assert_eq!(registry.get_swarm_agents(swarm).unwrap().len(), 2);
        assert!(registry.get_agent_swarms(&"c".into()).is_empty());
    }

    #[test]
    fn test_agent_swarm_cap() {
        let registry = registry(5, 1, 5);
        registry.register_agent(StubAgent::new("a")).unwrap();
        let s1 = registry.create_swarm("s1", "", &["a".into()]);
        let s2 = registry.create_swarm("s2", "", &["a".into()]);

        assert_eq!(registry.get_agent_swarms(&"a".into()), vec![s1]);
        assert!(registry.get_swarm_agents(s2).unwrap().is_empty());
        assert!(matches!(
            registry.add_agent_to_swarm(&"a".into(), s2),
            Err(SwarmError::AgentAtSwarmCapacity { max: 1, .. })
        ));
    }

    #[test]
    fn test_adding_existing_member_is_noop() {
        let registry = registry(1, 1, 1);
        registry.register_agent(StubAgent::new("a")).unwrap();
        let swarm = registry.create_swarm("s", "", &["a".into()]);
        registry.add_agent_to_swarm(&"a".into(), swarm).unwrap();
        registry.add_task_to_swarm("t", swarm).unwrap();
        registry.add_task_to_swarm("t", swarm).unwrap();
        assert_eq!(registry.get_swarm_tasks(swarm).unwrap(), vec!["t".to_string()]);
    }

    #[test]
    fn test_not_found_errors() {
        let registry = registry(5, 5, 5);
        let ghost = SwarmId::new();
        assert!(matches!(registry.delete_swarm(ghost), Err(SwarmError::SwarmNotFound(_))));
        assert!(matches!(
            registry.add_agent_to_swarm(&"a".into(), ghost),
            Err(SwarmError::SwarmNotFound(_))
        ));

        let swarm = registry.create_swarm("s", "", &[]);
        assert!(matches!(
            registry.add_agent_to_swarm(&"nobody".into(), swarm),
            Err(SwarmError::AgentNotFound(_))
        ));
        assert!(matches!(
            registry.remove_agent_from_swarm(&"nobody".into(), swarm),
            Err(SwarmError::AgentNotInSwarm { .. })
        ));
        assert!(matches!(
            registry.remove_task_from_swarm("t", swarm),
            Err(SwarmError::TaskNotInSwarm { .. })
        ));
        assert!(matches!(
            registry.unregister_agent(&"nobody".into()),
            Err(SwarmError::AgentNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = registry(5, 5, 5);
        registry.register_agent(StubAgent::new("a")).unwrap();
        assert!(matches!(
            registry.register_agent(StubAgent::new("a")),
            Err(SwarmError::AgentAlreadyRegistered(_))
        ));
        assert_eq!(registry.agent_count(), 1);
    }

    #[test]
    fn test_delete_swarm_cascades_to_indices() {
        let registry = registry(5, 5, 5);
        registry.register_agent(StubAgent::new("a")).unwrap();
        let keep = registry.create_swarm("keep", "", &["a".into()]);
        let doomed = registry.create_swarm("doomed", "", &["a".into()]);
        registry.add_task_to_swarm("t1", doomed).unwrap();
        registry.add_task_to_swarm("t1", keep).unwrap();

        registry.delete_swarm(doomed).unwrap();

        assert!(registry.get_swarm(doomed).is_none());
        assert_eq!(registry.get_agent_swarms(&"a".into()), vec![keep]);
        assert_eq!(registry.get_task_swarms("t1"), vec![keep]);
        assert_eq!(registry.swarm_count(), 1);
    }

    #[test]
    fn test_unregister_evicts_from_all_swarms() {
        let registry = registry(5, 5, 5);
        registry.register_agent(StubAgent::new("a")).unwrap();
        let s1 = registry.create_swarm("s1", "", &["a".into()]);
        let s2 = registry.create_swarm("s2", "", &["a".into()]);
        let before = registry.get_swarm(s1).unwrap().updated_at;

        registry.unregister_agent(&"a".into()).unwrap();

        assert!(registry.get_agent(&"a".into()).is_none());
        assert!(registry.get_agent_swarms(&"a".into()).is_empty());
        assert!(registry.get_swarm_agents(s1).unwrap().is_empty());
        assert!(registry.get_swarm_agents(s2).unwrap().is_empty());
        assert!(registry.get_swarm(s1).unwrap().updated_at >= before);
    }

    #[test]
    fn test_accessors_return_copies() {
        let registry = registry(5, 5, 5);
        let swarm = registry.create_swarm("s", "", &[]);
        let mut copy = registry.get_swarm(swarm).unwrap();
        copy.tasks.insert("injected".into());
        assert!(registry.get_swarm_tasks(swarm).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_skips_failing_agents() {
        let registry = registry(5, 5, 5);
        let good = StubAgent::new("good");
        registry.register_agent(good.clone()).unwrap();
        registry.register_agent(StubAgent::refusing("bad")).unwrap();
        let swarm = registry.create_swarm("s", "", &["good".into(), "bad".into()]);

        let delivered = registry
            .broadcast_to_swarm(swarm, &AgentMessage::new("ping", serde_json::Value::Null))
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(good.received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_swarm() {
        let registry = registry(5, 5, 5);
        let swarm = registry.create_swarm("s", "", &[]);
        let msg = AgentMessage::new("ping", serde_json::Value::Null);
        assert!(matches!(
            registry.broadcast_to_swarm(swarm, &msg).await,
            Err(SwarmError::EmptySwarm(_))
        ));
        assert!(matches!(
            registry.broadcast_to_swarm(SwarmId::new(), &msg).await,
            Err(SwarmError::SwarmNotFound(_))
        ));
    }
}
