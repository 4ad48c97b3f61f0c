use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::Priority;

/// Top-level configuration loaded from `~/.agent-crew/config.toml`.
///
/// Every section is optional; missing sections and keys fall back to their
/// defaults so a partial file is always valid input.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

impl Config {
    /// Load config from `~/.agent-crew/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Semantic validation for settings that are not fully expressible via type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.general.validate()?;
        self.agents.validate()?;
        self.coordinator.validate()?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agent-crew")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl GeneralConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.log_format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "general.log_format must be `pretty` or `json`, got `{other}`"
            ))),
        }
    }
}

fn default_project_name() -> String {
    "agent-crew".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}

/// What an agent does with a task whose execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailedTaskPolicy {
    /// Keep the failed task in the agent's queue for inspection or retry.
    #[default]
    Retain,
    /// Drop the failed task from the agent's queue, like a completed one.
    Dequeue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_eta_minutes")]
    pub default_eta_minutes: u32,
    /// Number of memory entries loaded as execution context.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
    #[serde(default)]
    pub failed_task_policy: FailedTaskPolicy,
    /// Upper bound on a single work executor call. Unset means no limit.
    #[serde(default)]
    pub execution_timeout_secs: Option<u64>,
    #[serde(default = "default_worker_channel_capacity")]
    pub worker_channel_capacity: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            default_eta_minutes: default_eta_minutes(),
            context_limit: default_context_limit(),
            failed_task_policy: FailedTaskPolicy::default(),
            execution_timeout_secs: None,
            worker_channel_capacity: default_worker_channel_capacity(),
        }
    }
}

impl AgentsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.execution_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "agents.execution_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.worker_channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "agents.worker_channel_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_eta_minutes() -> u32 {
    30
}
fn default_context_limit() -> usize {
    2
}
fn default_worker_channel_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistryConfig {
    /// Reject duplicate agent names instead of replacing the earlier agent.
    #[serde(default)]
    pub strict_registration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub strict_registration: bool,
    #[serde(default = "default_collaborative_priority")]
    pub collaborative_priority: u8,
    /// Characters of the shared description copied into sub-task titles.
    #[serde(default = "default_title_excerpt_chars")]
    pub title_excerpt_chars: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            strict_registration: false,
            collaborative_priority: default_collaborative_priority(),
            title_excerpt_chars: default_title_excerpt_chars(),
        }
    }
}

impl CoordinatorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Priority::new(self.collaborative_priority).map_err(|e| {
            ConfigError::Validation(format!("coordinator.collaborative_priority: {e}"))
        })?;
        Ok(())
    }

    /// Priority applied to every sub-task of a collaborative task.
    pub fn collaborative_priority(&self) -> Priority {
        Priority::new(self.collaborative_priority).unwrap_or(Priority::HIGH)
    }
}

fn default_collaborative_priority() -> u8 {
    4
}
fn default_title_excerpt_chars() -> usize {
    50
}
