//! A team: one agent registry plus one task queue, with the delegation entry
//! point used by the cross-team coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use ac_core::types::{Priority, Task, TaskId, TaskResult, TaskStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::agent::{Agent, AgentReport};
use crate::registry::{AgentRegistry, RegistryError};
use crate::task_queue::{TaskQueue, TaskQueueError};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TeamError {
    #[error("agent not found: `{0}`")]
    AgentNotFound(String),
    #[error("task {0} has no assignee")]
    Unassigned(TaskId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Queue(#[from] TaskQueueError),
}

pub type Result<T> = std::result::Result<T, TeamError>;

// ---------------------------------------------------------------------------
// TeamDelegate
// ---------------------------------------------------------------------------

/// A unit of work handed to another team's agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRequest {
    pub agent_name: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub requested_by: String,
}

/// Entry point the coordinator uses to run work inside a team.
#[async_trait]
pub trait TeamDelegate: Send + Sync {
    async fn delegate(&self, request: DelegationRequest) -> Result<TaskResult>;
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Team {
    name: String,
    registry: AgentRegistry,
    queue: TaskQueue,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_registry(name, AgentRegistry::new())
    }

    pub fn with_registry(name: impl Into<String>, registry: AgentRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
            queue: TaskQueue::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub async fn add_agent(&self, agent: Arc<Agent>) -> Result<()> {
        self.registry.register(agent).await?;
        Ok(())
    }

    /// Build a task originating from this team and store it in the queue.
    pub async fn create_task(
        &self,
        title: &str,
        description: &str,
        assigned_to: Option<&str>,
        priority: Priority,
        context: HashMap<String, serde_json::Value>,
    ) -> Result<Task> {
        let mut task = Task::new(title, description)
            .with_priority(priority)
            .assigned_by(self.name.clone());
        task.assigned_to = assigned_to.map(str::to_string);
        task.context = context;
        self.queue.add_task(task.clone()).await?;
        Ok(task)
    }

    /// Run `task` on its assigned agent and record the outcome in the queue.
    ///
    /// A task not yet known to the queue is added first.
    pub async fn execute_task(&self, task: Task) -> Result<TaskResult> {
        let agent_name = task
            .assigned_to
            .clone()
            .ok_or(TeamError::Unassigned(task.id))?;
        let agent = self
            .registry
            .get_agent(&agent_name)
            .await
            .ok_or_else(|| TeamError::AgentNotFound(agent_name.clone()))?;

        let task_id = task.id;
        if self.queue.get_task(task_id).await.is_none() {
            self.queue.add_task(task.clone()).await?;
        }
        self.queue.assign_to_agent(task_id, &agent_name).await?;
        agent.receive_task(task.clone()).await;
        self.queue
            .update_status(task_id, TaskStatus::InProgress)
            .await?;

        let mut working = task;
        working.status = TaskStatus::Pending;
        let result = agent.process_task(&mut working).await;
        self.queue.complete_task(task_id, result.clone()).await?;

        info!(team = %self.name, agent = %agent_name, task_id = %task_id, status = %working.status, "team task finished");
        Ok(result)
    }

    /// Create a task for `agent_name` and execute it immediately.
    pub async fn delegate_to_agent(
        &self,
        agent_name: &str,
        title: &str,
        description: &str,
        priority: Priority,
    ) -> Result<TaskResult> {
        let task = self
            .create_task(title, description, Some(agent_name), priority, HashMap::new())
            .await?;
        self.execute_task(task).await
    }

    pub async fn list_agents(&self) -> Vec<AgentReport> {
        self.registry
            .get_all_agents()
            .await
            .iter()
            .map(|a| a.report_status())
            .collect()
    }

    pub async fn pending_tasks(&self) -> Vec<Task> {
        self.queue.get_pending_tasks().await
    }

    pub async fn task_history(&self, limit: usize) -> Vec<Task> {
        self.queue.get_task_history(limit).await
    }
}

#[async_trait]
impl TeamDelegate for Team {
    async fn delegate(&self, request: DelegationRequest) -> Result<TaskResult> {
        let mut context = HashMap::new();
        context.insert(
            "requested_by".to_string(),
            serde_json::Value::String(request.requested_by.clone()),
        );
        let task = self
            .create_task(
                &request.title,
                &request.description,
                Some(&request.agent_name),
                request.priority,
                context,
            )
            .await?;
        self.execute_task(task).await
    }
}
