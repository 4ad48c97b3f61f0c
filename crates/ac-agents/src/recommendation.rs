//! Keyword-driven collaboration recommendations.
//!
//! A [`RecommendationRule`] fires when any of its keywords occurs in the
//! lowercased project description. Each fired rule names the expertise to
//! look up through the coordinator's expert discovery.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRule {
    pub keywords: Vec<String>,
    /// Expertise terms resolved in order; each contributes its first expert.
    pub expertise: Vec<String>,
    pub reason: String,
    /// Team-level explanation added once when the rule fires.
    pub reasoning: Option<String>,
}

impl RecommendationRule {
    pub fn new<K, E>(keywords: K, expertise: E, reason: impl Into<String>) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(|k| k.into().to_lowercase()).collect(),
            expertise: expertise.into_iter().map(Into::into).collect(),
            reason: reason.into(),
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// `description_lower` must already be lowercased.
    pub fn matches(&self, description_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| description_lower.contains(k.as_str()))
    }
}

/// Built-in rule table covering development, data, design, investigation,
/// finance, market, legal, analytics, reporting and document work.
pub fn default_rules() -> Vec<RecommendationRule> {
    vec![
        RecommendationRule::new(
            ["build", "develop", "code", "implement", "feature"],
            ["orchestrator", "developer"],
            "project coordination and implementation",
        )
        .with_reasoning("Development work requires the technical team"),
        RecommendationRule::new(
            ["database", "data model", "schema"],
            ["database"],
            "database specialist",
        ),
        RecommendationRule::new(
            ["ui", "ux", "design", "interface"],
            ["designer"],
            "UI/UX design",
        ),
        RecommendationRule::new(
            ["investigate", "research", "osint", "intelligence"],
            ["investigation", "osint"],
            "investigation and open-source intelligence",
        )
        .with_reasoning("Investigation requires the analytical team"),
        RecommendationRule::new(
            ["financial", "finance", "money", "investment"],
            ["financial"],
            "financial analysis",
        ),
        RecommendationRule::new(
            ["market", "competitor", "customer", "consumer"],
            ["market"],
            "market research",
        ),
        RecommendationRule::new(
            ["legal", "compliance", "regulation", "contract"],
            ["legal"],
            "legal analysis",
        ),
        RecommendationRule::new(
            ["data analysis", "statistics", "visualization", "dashboard"],
            ["data analysis"],
            "data analysis",
        ),
        RecommendationRule::new(
            ["report", "documentation", "summary"],
            ["report"],
            "report synthesis",
        ),
        RecommendationRule::new(
            ["document", "pdf", "process", "extract"],
            ["document processing"],
            "document processing",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAgent {
    pub name: String,
    pub team: String,
    pub role: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationRecommendation {
    pub project: String,
    pub recommended_agents: Vec<RecommendedAgent>,
    pub reasoning: Vec<String>,
    /// Recommended agents per team, in first-seen order.
    pub team_composition: IndexMap<String, usize>,
    pub total: usize,
}

impl CollaborationRecommendation {
    pub(crate) fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            recommended_agents: Vec::new(),
            reasoning: Vec::new(),
            team_composition: IndexMap::new(),
            total: 0,
        }
    }

    /// Add an agent unless one with the same name is already recommended.
    pub(crate) fn push(&mut self, agent: RecommendedAgent) -> bool {
        if self.recommended_agents.iter().any(|a| a.name == agent.name) {
            return false;
        }
        *self.team_composition.entry(agent.team.clone()).or_default() += 1;
        self.total += 1;
        self.recommended_agents.push(agent);
        true
    }

    pub fn names(&self) -> Vec<&str> {
        self.recommended_agents
            .iter()
            .map(|a| a.name.as_str())
            .collect()
    }
}
