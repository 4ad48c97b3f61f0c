use std::sync::Arc;

use ac_core::types::AgentStatus;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::agent::Agent;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("agent not found: `{0}`")]
    AgentNotFound(String),
    #[error("duplicate agent name: `{0}`")]
    DuplicateAgent(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// RegistryStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total: usize,
    pub available: usize,
    pub busy: usize,
    pub offline: usize,
    pub error: usize,
}

// ---------------------------------------------------------------------------
// AgentRegistry
// ---------------------------------------------------------------------------

/// Name-keyed directory of live agents.
///
/// Agents are kept in registration order. Re-registering a name replaces the
/// earlier agent in place unless the registry is strict, in which case the
/// second registration is refused.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<IndexMap<String, Arc<Agent>>>,
    strict: bool,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            agents: RwLock::default(),
            strict: true,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    // -- Mutation --

    pub async fn register(&self, agent: Arc<Agent>) -> Result<()> {
        let name = agent.name().to_string();
        let mut agents = self.agents.write().await;
        if agents.contains_key(&name) {
            if self.strict {
                return Err(RegistryError::DuplicateAgent(name));
            }
            warn!(agent = %name, "replacing previously registered agent");
        }
        debug!(agent = %name, role = agent.role(), "registered agent");
        agents.insert(name, agent);
        Ok(())
    }

    /// Remove an agent. Returns `false` when the name was not registered.
    pub async fn unregister(&self, name: &str) -> bool {
        let removed = self.agents.write().await.shift_remove(name).is_some();
        if removed {
            debug!(agent = %name, "unregistered agent");
        }
        removed
    }

    // -- Queries --

    pub async fn get_agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.read().await.get(name).cloned()
    }

    /// Like [`AgentRegistry::get_agent`] but fails with `AgentNotFound`.
    pub async fn require(&self, name: &str) -> Result<Arc<Agent>> {
        self.get_agent(name)
            .await
            .ok_or_else(|| RegistryError::AgentNotFound(name.to_string()))
    }

    pub async fn get_all_agents(&self) -> Vec<Arc<Agent>> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn get_available_agents(&self) -> Vec<Arc<Agent>> {
        self.with_status(AgentStatus::Available).await
    }

    pub async fn get_busy_agents(&self) -> Vec<Arc<Agent>> {
        self.with_status(AgentStatus::Busy).await
    }

    /// Agents whose role equals `role` exactly.
    pub async fn find_by_role(&self, role: &str) -> Vec<Arc<Agent>> {
        self.filter(|a| a.role() == role).await
    }

    /// Agents whose specialization contains `keyword`, ignoring case.
    pub async fn find_by_specialization(&self, keyword: &str) -> Vec<Arc<Agent>> {
        let needle = keyword.to_lowercase();
        self.filter(|a| a.specialization().to_lowercase().contains(&needle))
            .await
    }

    pub async fn get_agent_count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Registered names in registration order.
    pub async fn list_agents(&self) -> Vec<String> {
        self.agents.read().await.keys().cloned().collect()
    }

    pub async fn get_stats(&self) -> RegistryStats {
        let agents = self.agents.read().await;
        let mut stats = RegistryStats {
            total: agents.len(),
            ..RegistryStats::default()
        };
        for agent in agents.values() {
            match agent.status() {
                AgentStatus::Available => stats.available += 1,
                AgentStatus::Busy => stats.busy += 1,
                AgentStatus::Offline => stats.offline += 1,
                AgentStatus::Error => stats.error += 1,
            }
        }
        stats
    }

    async fn with_status(&self, status: AgentStatus) -> Vec<Arc<Agent>> {
        self.filter(|a| a.status() == status).await
    }

    async fn filter(&self, pred: impl Fn(&Agent) -> bool) -> Vec<Arc<Agent>> {
        self.agents
            .read()
            .await
            .values()
            .filter(|&a| pred(a))
            .cloned()
            .collect()
    }
}
