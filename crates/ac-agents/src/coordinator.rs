//! Cross-team coordination: expert discovery over every registered team and
//! delegation routed to the team that owns the target agent.

use std::sync::Arc;

use ac_core::config::CoordinatorConfig;
use ac_core::types::{AgentStatus, Priority, TaskResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::recommendation::{
    default_rules, CollaborationRecommendation, RecommendationRule, RecommendedAgent,
};
use crate::team::{DelegationRequest, Team, TeamDelegate};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("agent not found: `{0}`")]
    AgentNotFound(String),
    #[error("team `{0}` has no delegation entry point")]
    TeamUnavailable(String),
    #[error("agent `{0}` is already registered")]
    DuplicateAgent(String),
    #[error("delegation failed: {0}")]
    Delegation(String),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// An agent together with the team it was registered under.
///
/// `status_snapshot` is the agent's status at registration and is never
/// refreshed; use [`TeamEntry::live_status`] for the current value.
#[derive(Debug, Clone)]
pub struct TeamEntry {
    pub agent: Arc<Agent>,
    pub team: String,
    pub role: String,
    pub specialization: String,
    pub status_snapshot: AgentStatus,
}

impl TeamEntry {
    fn capture(team: &str, agent: Arc<Agent>) -> Self {
        Self {
            team: team.to_string(),
            role: agent.role().to_string(),
            specialization: agent.specialization().to_string(),
            status_snapshot: agent.status(),
            agent,
        }
    }

    pub fn name(&self) -> &str {
        self.agent.name()
    }

    pub fn live_status(&self) -> AgentStatus {
        self.agent.status()
    }

    /// Summary with the agent's current status.
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.agent.name().to_string(),
            role: self.role.clone(),
            specialization: self.specialization.clone(),
            team: self.team.clone(),
            status: self.live_status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    pub role: String,
    pub specialization: String,
    pub team: String,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub size: usize,
    pub roles: Vec<String>,
    pub specializations: Vec<String>,
    pub agents: Vec<AgentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCapabilities {
    pub teams: IndexMap<String, TeamProfile>,
    pub total_agents: usize,
}

// ---------------------------------------------------------------------------
// CrossTeamCoordinator
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Directory {
    agents: IndexMap<String, TeamEntry>,
    teams: IndexMap<String, Option<Arc<dyn TeamDelegate>>>,
}

pub struct CrossTeamCoordinator {
    directory: RwLock<Directory>,
    settings: CoordinatorConfig,
    rules: Vec<RecommendationRule>,
}

impl std::fmt::Debug for CrossTeamCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossTeamCoordinator")
            .field("settings", &self.settings)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl Default for CrossTeamCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossTeamCoordinator {
    pub fn new() -> Self {
        Self::with_config(&CoordinatorConfig::default())
    }

    pub fn with_config(cfg: &CoordinatorConfig) -> Self {
        Self {
            directory: RwLock::default(),
            settings: cfg.clone(),
            rules: default_rules(),
        }
    }

    /// Replace the recommendation rule table.
    pub fn with_rules(mut self, rules: Vec<RecommendationRule>) -> Self {
        self.rules = rules;
        self
    }

    // -- Registration --

    /// Merge `agents` into the directory under `team_name`.
    ///
    /// A name already present is overwritten (keeping its position) unless
    /// the coordinator is strict. Without a delegate the team's agents are
    /// discoverable but cannot receive delegated work.
    pub async fn register_team(
        &self,
        team_name: &str,
        agents: Vec<Arc<Agent>>,
        delegate: Option<Arc<dyn TeamDelegate>>,
    ) -> Result<()> {
        let mut dir = self.directory.write().await;
        if self.settings.strict_registration {
            if let Some(dup) = agents.iter().find(|a| dir.agents.contains_key(a.name())) {
                return Err(CoordinatorError::DuplicateAgent(dup.name().to_string()));
            }
        }
        for agent in agents {
            let name = agent.name().to_string();
            if let Some(prev) = dir.agents.get(&name) {
                warn!(agent = %name, from = %prev.team, to = %team_name, "agent re-registered");
            }
            dir.agents.insert(name, TeamEntry::capture(team_name, agent));
        }
        dir.teams.insert(team_name.to_string(), delegate);
        debug!(team = %team_name, total = dir.agents.len(), "team registered");
        Ok(())
    }

    /// Register a [`Team`] with its own agents and delegation entry point.
    pub async fn register(&self, team: Arc<Team>) -> Result<()> {
        let agents = team.registry().get_all_agents().await;
        let name = team.name().to_string();
        self.register_team(&name, agents, Some(team as Arc<dyn TeamDelegate>))
            .await
    }

    // -- Discovery --

    pub async fn find_agent(&self, name: &str) -> Option<TeamEntry> {
        self.directory.read().await.agents.get(name).cloned()
    }

    /// Agents whose role or specialization contains `keyword`, ignoring case.
    pub async fn find_agents_by_role(&self, keyword: &str) -> Vec<TeamEntry> {
        let needle = keyword.to_lowercase();
        self.select(|a| {
            a.role().to_lowercase().contains(&needle)
                || a.specialization().to_lowercase().contains(&needle)
        })
        .await
    }

    pub async fn find_agents_by_specialization(&self, keyword: &str) -> Vec<TeamEntry> {
        let needle = keyword.to_lowercase();
        self.select(|a| a.specialization().to_lowercase().contains(&needle))
            .await
    }

    /// Role matches followed by specialization matches, each agent once, in
    /// registration order within each group.
    pub async fn find_expert(&self, keyword: &str) -> Vec<TeamEntry> {
        let mut experts = self.find_agents_by_role(keyword).await;
        for entry in self.find_agents_by_specialization(keyword).await {
            if !experts.iter().any(|e| e.name() == entry.name()) {
                experts.push(entry);
            }
        }
        experts
    }

    pub async fn get_team_roster(&self, team: &str) -> Vec<AgentSummary> {
        self.directory
            .read()
            .await
            .agents
            .values()
            .filter(|e| e.team == team)
            .map(TeamEntry::summary)
            .collect()
    }

    /// Every registered agent grouped by team, in registration order.
    pub async fn get_all_agents(&self) -> IndexMap<String, Vec<AgentSummary>> {
        let dir = self.directory.read().await;
        let mut grouped: IndexMap<String, Vec<AgentSummary>> = dir
            .teams
            .keys()
            .map(|t| (t.clone(), Vec::new()))
            .collect();
        for entry in dir.agents.values() {
            grouped
                .entry(entry.team.clone())
                .or_default()
                .push(entry.summary());
        }
        grouped
    }

    pub async fn get_team_capabilities(&self) -> TeamCapabilities {
        let grouped = self.get_all_agents().await;
        let total_agents = grouped.values().map(Vec::len).sum();
        let teams = grouped
            .into_iter()
            .map(|(team, agents)| {
                let mut roles: Vec<String> = Vec::new();
                let mut specializations: Vec<String> = Vec::new();
                for a in &agents {
                    if !roles.contains(&a.role) {
                        roles.push(a.role.clone());
                    }
                    if !specializations.contains(&a.specialization) {
                        specializations.push(a.specialization.clone());
                    }
                }
                let profile = TeamProfile {
                    size: agents.len(),
                    roles,
                    specializations,
                    agents,
                };
                (team, profile)
            })
            .collect();
        TeamCapabilities {
            teams,
            total_agents,
        }
    }

    // -- Delegation --

    /// Hand a task from `from_agent` to `to_agent` through the owning team.
    pub async fn delegate_cross_team(
        &self,
        from_agent: &str,
        to_agent: &str,
        title: &str,
        description: &str,
        priority: Priority,
    ) -> Result<TaskResult> {
        let (team, delegate) = {
            let dir = self.directory.read().await;
            let entry = dir
                .agents
                .get(to_agent)
                .ok_or_else(|| CoordinatorError::AgentNotFound(to_agent.to_string()))?;
            let delegate = dir
                .teams
                .get(&entry.team)
                .cloned()
                .flatten()
                .ok_or_else(|| CoordinatorError::TeamUnavailable(entry.team.clone()))?;
            (entry.team.clone(), delegate)
        };

        info!(from = %from_agent, to = %to_agent, team = %team, title, "cross-team delegation");
        let request = DelegationRequest {
            agent_name: to_agent.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            priority,
            requested_by: from_agent.to_string(),
        };
        delegate
            .delegate(request)
            .await
            .map_err(|e| CoordinatorError::Delegation(e.to_string()))
    }

    /// Run one sub-task per expertise, sequentially, on the first expert
    /// found for each. Results are keyed by agent name; expertise without an
    /// expert, or whose delegation fails, contributes nothing.
    pub async fn collaborative_task<S: AsRef<str>>(
        &self,
        description: &str,
        expertise: &[S],
        coordinator_name: &str,
    ) -> IndexMap<String, TaskResult> {
        let priority = self.settings.collaborative_priority();
        let excerpt: String = description
            .chars()
            .take(self.settings.title_excerpt_chars)
            .collect();

        let mut results = IndexMap::new();
        for area in expertise.iter().map(AsRef::as_ref) {
            let Some(expert) = self.find_expert(area).await.into_iter().next() else {
                warn!(expertise = %area, "no expert found; skipping");
                continue;
            };
            let title = format!("{} for: {excerpt}", title_case(area));
            let task_description = format!("Provide {area} expertise for: {description}");

            match self
                .delegate_cross_team(
                    coordinator_name,
                    expert.name(),
                    &title,
                    &task_description,
                    priority,
                )
                .await
            {
                Ok(result) => {
                    results.insert(expert.name().to_string(), result);
                }
                Err(e) => {
                    warn!(expertise = %area, agent = %expert.name(), error = %e, "collaborative sub-task not delegated");
                }
            }
        }
        info!(contributors = results.len(), "collaborative task complete");
        results
    }

    // -- Recommendation --

    pub async fn recommend_collaboration(&self, project: &str) -> CollaborationRecommendation {
        let lower = project.to_lowercase();
        let mut rec = CollaborationRecommendation::new(project);

        for rule in self.rules.iter().filter(|r| r.matches(&lower)) {
            for area in &rule.expertise {
                if let Some(expert) = self.find_expert(area).await.into_iter().next() {
                    rec.push(RecommendedAgent {
                        name: expert.name().to_string(),
                        team: expert.team.clone(),
                        role: expert.role.clone(),
                        reason: rule.reason.clone(),
                    });
                }
            }
            if let Some(reasoning) = &rule.reasoning {
                if !rec.reasoning.contains(reasoning) {
                    rec.reasoning.push(reasoning.clone());
                }
            }
        }
        rec
    }

    async fn select(&self, pred: impl Fn(&Agent) -> bool) -> Vec<TeamEntry> {
        self.directory
            .read()
            .await
            .agents
            .values()
            .filter(|e| pred(&e.agent))
            .cloned()
            .collect()
    }
}

/// Uppercase the first letter of every word and lowercase the rest. Any
/// non-alphabetic character starts a new word.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}
