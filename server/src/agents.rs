//! Agent registry — tracks registered agents and their heartbeats.
//!
//! Agents whose last heartbeat is older than the timeout are reported as
//! offline rather than removed, so the dashboard can show them greyed out.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

const HEARTBEAT_TIMEOUT_SECS: u64 = 30;

struct TrackedAgent {
    agent_type: String,
    capabilities: Vec<String>,
    status: String,
    registered_at: i64,
    last_heartbeat: Instant,
}

/// Point-in-time view of an agent, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub agent_type: String,
    pub capabilities: Vec<String>,
    pub status: String,
    pub registered_at: i64,
    pub seconds_since_heartbeat: u64,
}

#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, TrackedAgent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) an agent; returns its snapshot
    pub fn register(
        &mut self,
        id: String,
        agent_type: String,
        capabilities: Vec<String>,
    ) -> AgentSnapshot {
        info!("Registering agent: {id} (type: {agent_type}, capabilities: {capabilities:?})");
        self.agents.insert(
            id.clone(),
            TrackedAgent {
                agent_type,
                capabilities,
                status: "idle".to_string(),
                registered_at: chrono::Utc::now().timestamp(),
                last_heartbeat: Instant::now(),
            },
        );
        // insert above guarantees presence
        self.snapshot(&id).unwrap_or(AgentSnapshot {
            id,
            agent_type: String::new(),
            capabilities: Vec::new(),
            status: "idle".into(),
            registered_at: 0,
            seconds_since_heartbeat: 0,
        })
    }

    /// Refresh an agent's heartbeat; false when the agent is unknown
    pub fn heartbeat(&mut self, id: &str, status: &str) -> bool {
        match self.agents.get_mut(id) {
            Some(agent) => {
                agent.last_heartbeat = Instant::now();
                agent.status = status.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        if self.agents.remove(id).is_some() {
            info!("Unregistered agent: {id}");
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self, id: &str) -> Option<AgentSnapshot> {
        self.agents.get(id).map(|agent| {
            let elapsed = agent.last_heartbeat.elapsed().as_secs();
            AgentSnapshot {
                id: id.to_string(),
                agent_type: agent.agent_type.clone(),
                capabilities: agent.capabilities.clone(),
                status: if elapsed > HEARTBEAT_TIMEOUT_SECS {
                    "offline".to_string()
                } else {
                    agent.status.clone()
                },
                registered_at: agent.registered_at,
                seconds_since_heartbeat: elapsed,
            }
        })
    }

    pub fn list(&self) -> Vec<AgentSnapshot> {
        let mut agents: Vec<AgentSnapshot> = self
            .agents
            .keys()
            .filter_map(|id| self.snapshot(id))
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    /// Agents with a recent heartbeat
    pub fn active_count(&self) -> usize {
        self.agents
            .values()
            .filter(|a| a.last_heartbeat.elapsed().as_secs() <= HEARTBEAT_TIMEOUT_SECS)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_register_and_list() {
        let mut registry = AgentRegistry::new();
        registry.register(
            "agent-1".into(),
            "code-reviewer".into(),
            vec!["review".into()],
        );
        registry.register("agent-2".into(), "planner".into(), vec![]);

        let agents = registry.list();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].id, "agent-1");
        assert_eq!(agents[0].status, "idle");
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_heartbeat_updates_status() {
        let mut registry = AgentRegistry::new();
        registry.register("agent-1".into(), "planner".into(), vec![]);
        assert!(registry.heartbeat("agent-1", "busy"));

        let snapshot = registry.snapshot("agent-1").unwrap();
        assert_eq!(snapshot.status, "busy");
    }

    #[test]
    fn test_heartbeat_unknown_agent() {
        let mut registry = AgentRegistry::new();
        assert!(!registry.heartbeat("ghost", "busy"));
    }

    #[test]
    fn test_stale_agent_reports_offline() {
        let mut registry = AgentRegistry::new();
        registry.register("agent-1".into(), "planner".into(), vec![]);

        // Backdate the heartbeat past the timeout
        if let Some(agent) = registry.agents.get_mut("agent-1") {
            agent.last_heartbeat = Instant::now() - Duration::from_secs(HEARTBEAT_TIMEOUT_SECS + 5);
        }

        let snapshot = registry.snapshot("agent-1").unwrap();
        assert_eq!(snapshot.status, "offline");
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_re_register_resets_agent() {
        let mut registry = AgentRegistry::new();
        registry.register("agent-1".into(), "planner".into(), vec![]);
        registry.heartbeat("agent-1", "busy");
        registry.register("agent-1".into(), "reviewer".into(), vec![]);

        let snapshot = registry.snapshot("agent-1").unwrap();
        assert_eq!(snapshot.agent_type, "reviewer");
        assert_eq!(snapshot.status, "idle");
    }

    #[test]
    fn test_remove() {
        let mut registry = AgentRegistry::new();
        registry.register("agent-1".into(), "planner".into(), vec![]);
        assert!(registry.remove("agent-1"));
        assert!(!registry.remove("agent-1"));
        assert!(registry.list().is_empty());
    }
}
