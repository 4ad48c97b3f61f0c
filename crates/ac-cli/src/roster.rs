//! Team roster files: which agents exist and which team they belong to.
//!
//! ```toml
//! [[team]]
//! name = "analytical"
//!
//! [[team.agent]]
//! name = "Marcus Chen"
//! role = "Financial Analyst"
//! specialization = "financial intelligence"
//! ```

use std::path::Path;
use std::sync::Arc;

use ac_agents::agent::Agent;
use ac_agents::coordinator::CrossTeamCoordinator;
use ac_agents::registry::AgentRegistry;
use ac_agents::team::Team;
use ac_core::config::Config;
use anyhow::Context;
use serde::{Deserialize, Serialize};

const BUILTIN: &str = r#"
[[team]]
name = "technical"

[[team.agent]]
name = "Aleksander Nowak"
role = "Orchestrator"
specialization = "project coordination"

[[team.agent]]
name = "Tomasz Kaminski"
role = "Developer"
specialization = "backend implementation"

[[team.agent]]
name = "Maria Wisniewska"
role = "Database Specialist"
specialization = "database design and schema"

[[team.agent]]
name = "Joanna Mazur"
role = "UI/UX Designer"
specialization = "interface design"

[[team]]
name = "analytical"

[[team.agent]]
name = "Viktor Kovalenko"
role = "Investigation Director"
specialization = "investigation coordination"

[[team.agent]]
name = "Elena Volkov"
role = "OSINT Specialist"
specialization = "osint and intelligence gathering"

[[team.agent]]
name = "Marcus Chen"
role = "Financial Analyst"
specialization = "financial intelligence"

[[team.agent]]
name = "Sofia Martinez"
role = "Market Researcher"
specialization = "market research"

[[team.agent]]
name = "Adrian Kowalski"
role = "Legal Analyst"
specialization = "legal research and compliance"

[[team.agent]]
name = "Maya Patel"
role = "Data Analyst"
specialization = "data analysis and statistics"

[[team.agent]]
name = "Lucas Rivera"
role = "Report Synthesizer"
specialization = "report writing"

[[team.agent]]
name = "Alex Morgan"
role = "Technical Liaison"
specialization = "document processing"
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub specialization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSpec {
    pub name: String,
    #[serde(default, rename = "agent")]
    pub agents: Vec<AgentSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default, rename = "team")]
    pub teams: Vec<TeamSpec>,
}

impl Roster {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading roster {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing roster {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let roster: Roster = toml::from_str(text)?;
        if roster.teams.is_empty() {
            anyhow::bail!("roster defines no teams");
        }
        Ok(roster)
    }

    /// The two-team roster used when no `--roster` file is given.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::parse(BUILTIN)
    }

    /// Create the agents and teams and register them with a coordinator.
    pub async fn build(&self, cfg: &Config) -> anyhow::Result<CrossTeamCoordinator> {
        let coordinator = CrossTeamCoordinator::with_config(&cfg.coordinator);
        for spec in &self.teams {
            let registry = if cfg.registry.strict_registration {
                AgentRegistry::strict()
            } else {
                AgentRegistry::new()
            };
            let team = Team::with_registry(spec.name.clone(), registry);
            for a in &spec.agents {
                let agent = Agent::new(&a.name, &a.role, &a.specialization).configured(&cfg.agents);
                team.add_agent(Arc::new(agent))
                    .await
                    .with_context(|| format!("team `{}`", spec.name))?;
            }
            coordinator
                .register(Arc::new(team))
                .await
                .with_context(|| format!("registering team `{}`", spec.name))?;
        }
        Ok(coordinator)
    }
}
