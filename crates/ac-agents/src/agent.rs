//! A named, long-lived worker with its own task queue.
//!
//! An [`Agent`] is shared as `Arc<Agent>` between registries, teams, the
//! coordinator and its worker. Short state updates go through a plain mutex
//! that is never held across an `.await`; a separate async execution slot
//! guarantees at most one in-flight [`Agent::process_task`] per agent.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ac_core::config::{AgentsConfig, FailedTaskPolicy};
use ac_core::types::{AckStatus, AgentStatus, Task, TaskAck, TaskId, TaskResult, TaskStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::executor::{GenericExecutor, WorkExecutionError, WorkExecutor};
use crate::memory::{MemoryProvider, NullMemory};

/// Prefix of the reasoning trace recorded when an execution exceeds its
/// time limit.
pub const TIMEOUT_MARKER: &str = "[timeout]";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("task {task_id}: cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    #[error("task {0} is not in this agent's queue")]
    TaskNotQueued(TaskId),
}

pub type Result<T> = std::result::Result<T, AgentError>;

// ---------------------------------------------------------------------------
// ETA estimation
// ---------------------------------------------------------------------------

/// Estimates minutes until a received task completes.
pub trait EtaEstimator: Send + Sync {
    fn estimate(&self, task: &Task) -> u32;
}

/// Same estimate for every task.
#[derive(Debug, Clone, Copy)]
pub struct FixedEta(pub u32);

impl EtaEstimator for FixedEta {
    fn estimate(&self, _task: &Task) -> u32 {
        self.0
    }
}

impl<F> EtaEstimator for F
where
    F: Fn(&Task) -> u32 + Send + Sync,
{
    fn estimate(&self, task: &Task) -> u32 {
        self(task)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub context_limit: usize,
    pub failed_task_policy: FailedTaskPolicy,
    pub execution_timeout: Option<Duration>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from(&AgentsConfig::default())
    }
}

impl From<&AgentsConfig> for AgentSettings {
    fn from(cfg: &AgentsConfig) -> Self {
        Self {
            context_limit: cfg.context_limit,
            failed_task_policy: cfg.failed_task_policy,
            execution_timeout: cfg.execution_timeout_secs.map(Duration::from_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentReport
// ---------------------------------------------------------------------------

/// Point-in-time snapshot returned by [`Agent::report_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub name: String,
    pub role: String,
    pub status: AgentStatus,
    pub current_task: Option<String>,
    pub queue_size: usize,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

struct AgentState {
    status: AgentStatus,
    queue: Vec<Task>,
    current_task: Option<Task>,
    tasks_completed: u64,
    tasks_failed: u64,
}

pub struct Agent {
    name: String,
    role: String,
    specialization: String,
    settings: AgentSettings,
    executor: Arc<dyn WorkExecutor>,
    memory: Arc<dyn MemoryProvider>,
    estimator: Box<dyn EtaEstimator>,
    state: Mutex<AgentState>,
    slot: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("specialization", &self.specialization)
            .field("status", &self.status())
            .finish()
    }
}

impl Agent {
    /// Create an agent backed by the generic executor, no memory and the
    /// default 30 minute ETA.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        specialization: impl Into<String>,
    ) -> Self {
        let settings = AgentSettings::default();
        Self {
            name: name.into(),
            role: role.into(),
            specialization: specialization.into(),
            settings,
            executor: Arc::new(GenericExecutor),
            memory: Arc::new(NullMemory),
            estimator: Box::new(FixedEta(AgentsConfig::default().default_eta_minutes)),
            state: Mutex::new(AgentState {
                status: AgentStatus::Available,
                queue: Vec::new(),
                current_task: None,
                tasks_completed: 0,
                tasks_failed: 0,
            }),
            slot: tokio::sync::Mutex::new(()),
        }
    }

    /// Apply the `[agents]` config section (settings plus the default ETA).
    pub fn configured(mut self, cfg: &AgentsConfig) -> Self {
        self.settings = AgentSettings::from(cfg);
        self.estimator = Box::new(FixedEta(cfg.default_eta_minutes));
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn WorkExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryProvider>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_estimator(mut self, estimator: impl EtaEstimator + 'static) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn specialization(&self) -> &str {
        &self.specialization
    }

    pub fn status(&self) -> AgentStatus {
        self.state().status
    }

    /// Externally driven status change (e.g. `Offline` or `Error`).
    pub fn set_status(&self, status: AgentStatus) {
        let mut state = self.state();
        debug!(agent = %self.name, from = %state.status, to = %status, "agent status set");
        state.status = status;
    }

    pub fn current_task(&self) -> Option<Task> {
        self.state().current_task.clone()
    }

    pub fn queue_len(&self) -> usize {
        self.state().queue.len()
    }

    /// Copy of the agent's queue in its current order.
    pub fn queue_snapshot(&self) -> Vec<Task> {
        self.state().queue.clone()
    }

    pub fn estimate_eta(&self, task: &Task) -> u32 {
        self.estimator.estimate(task)
    }

    // -- Queue operations --

    /// Accept a task into this agent's queue and acknowledge it.
    pub async fn receive_task(&self, mut task: Task) -> TaskAck {
        task.status = TaskStatus::Pending;
        let ack = TaskAck {
            task_id: task.id,
            agent_name: self.name.clone(),
            ack_status: AckStatus::Acknowledged,
            eta_minutes: self.estimator.estimate(&task),
        };
        let note = format!("Received task: {} - {}", task.title, task.description);
        debug!(agent = %self.name, task_id = %task.id, priority = %task.priority, "task received");
        self.state().queue.push(task);

        self.remember(&note, 0.7, "task_received").await;
        ack
    }

    /// Re-sort the queue by priority (highest first, ties keep their current
    /// order) and return its head, whatever its status.
    pub fn get_next_task(&self) -> Option<Task> {
        let mut state = self.state();
        state.queue.sort_by(|a, b| b.priority.cmp(&a.priority));
        state.queue.first().cloned()
    }

    /// Remove a task from the queue, returning it.
    pub fn remove_task(&self, task_id: TaskId) -> Option<Task> {
        let mut state = self.state();
        let pos = state.queue.iter().position(|t| t.id == task_id)?;
        Some(state.queue.remove(pos))
    }

    /// Move a queued task to `to`, enforcing the task transition table.
    ///
    /// `Done` and `Failed` are only reachable through [`Agent::process_task`]
    /// since they must carry a result.
    pub fn transition_task(&self, task_id: TaskId, to: TaskStatus) -> Result<TaskStatus> {
        let mut state = self.state();
        let task = state
            .queue
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(AgentError::TaskNotQueued(task_id))?;

        let from = task.status;
        if to.carries_result() || !from.can_transition_to(&to) {
            return Err(AgentError::InvalidTransition { task_id, from, to });
        }
        if from == TaskStatus::Failed && to == TaskStatus::Pending {
            task.reset_for_retry();
        } else {
            task.status = to;
        }
        debug!(agent = %self.name, task_id = %task_id, %from, %to, "task transition");
        Ok(to)
    }

    /// Put a failed task back to `Pending` so it can be picked up again.
    pub fn requeue_failed(&self, task_id: TaskId) -> Result<()> {
        let from = self
            .state()
            .queue
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.status)
            .ok_or(AgentError::TaskNotQueued(task_id))?;
        if from != TaskStatus::Failed {
            return Err(AgentError::InvalidTransition {
                task_id,
                from,
                to: TaskStatus::Pending,
            });
        }
        self.transition_task(task_id, TaskStatus::Pending)
            .map(|_| ())
    }

    // -- Execution --

    /// Execute `task` with this agent's work executor.
    ///
    /// Executor failures never escape: they become a failed [`TaskResult`].
    /// The agent is `Busy` for the duration of the call and `Available`
    /// afterwards, whatever the outcome.
    pub async fn process_task(&self, task: &mut Task) -> TaskResult {
        let _slot = self.slot.lock().await;
        self.run(task).await
    }

    /// Pick the highest-priority pending task from the queue (earliest
    /// received wins ties) and process it.
    pub async fn process_next(&self) -> Option<TaskResult> {
        let _slot = self.slot.lock().await;
        let mut task = {
            let state = self.state();
            let mut best: Option<&Task> = None;
            for t in state.queue.iter().filter(|t| t.is_schedulable()) {
                if best.map_or(true, |b| t.priority > b.priority) {
                    best = Some(t);
                }
            }
            best.cloned()
        }?;
        Some(self.run(&mut task).await)
    }

    /// Snapshot of name, role, status and counters.
    pub fn report_status(&self) -> AgentReport {
        let state = self.state();
        AgentReport {
            name: self.name.clone(),
            role: self.role.clone(),
            status: state.status,
            current_task: state.current_task.as_ref().map(|t| t.title.clone()),
            queue_size: state.queue.len(),
            tasks_completed: state.tasks_completed,
            tasks_failed: state.tasks_failed,
        }
    }

    // -- Internals --

    async fn run(&self, task: &mut Task) -> TaskResult {
        if !task.status.can_transition_to(&TaskStatus::InProgress) {
            warn!(agent = %self.name, task_id = %task.id, status = %task.status, "processing task that is not pending");
        }
        task.start();
        let _busy = BusyGuard::enter(self, task);
        info!(agent = %self.name, task_id = %task.id, title = %task.title, "processing task");

        let context = self.load_context(&task.description).await;
        let started = Instant::now();
        let outcome = self.execute(task, &context).await;
        let elapsed = started.elapsed().as_secs_f64();

        // Executors that do not time themselves get the wall-clock duration.
        let outcome = outcome.map(|r| {
            if r.time_taken_seconds > 0.0 {
                r
            } else {
                r.with_time_taken(elapsed)
            }
        });

        match outcome {
            Ok(result) if result.is_done() => self.on_done(task, result).await,
            Ok(result) => self.on_failed(task, result, "executor reported failure"),
            Err(e) => {
                let trace = match &e {
                    WorkExecutionError::Timeout(secs) => {
                        format!("{TIMEOUT_MARKER} task exceeded its {secs}s execution limit")
                    }
                    other => format!("Task failed with error: {other}"),
                };
                let fallback = TaskResult::failed(task.id, self.name.clone(), trace)
                    .with_time_taken(elapsed)
                    .with_next_steps("review error and retry");
                self.on_failed(task, fallback, &e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        task: &Task,
        context: &[String],
    ) -> std::result::Result<TaskResult, WorkExecutionError> {
        let work = self.executor.execute(&self.name, task, context);
        match self.settings.execution_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or(Err(WorkExecutionError::Timeout(limit.as_secs()))),
            None => work.await,
        }
    }

    async fn on_done(&self, task: &mut Task, result: TaskResult) -> TaskResult {
        task.finish(result.clone());
        {
            let mut state = self.state();
            state.queue.retain(|t| t.id != task.id);
            state.tasks_completed += 1;
        }
        info!(agent = %self.name, task_id = %task.id, seconds = result.time_taken_seconds, "task complete");

        let note = format!("Completed task: {}\n{}", task.title, result.reasoning_trace);
        self.remember(&note, 0.85, "task_completed").await;
        result
    }

    fn on_failed(&self, task: &mut Task, result: TaskResult, reason: &str) -> TaskResult {
        task.finish(result.clone());
        let mut state = self.state();
        state.tasks_failed += 1;
        match self.settings.failed_task_policy {
            FailedTaskPolicy::Retain => {
                if let Some(queued) = state.queue.iter_mut().find(|t| t.id == task.id) {
                    *queued = task.clone();
                }
            }
            FailedTaskPolicy::Dequeue => state.queue.retain(|t| t.id != task.id),
        }
        warn!(agent = %self.name, task_id = %task.id, reason, "task failed");
        result
    }

    async fn load_context(&self, query: &str) -> Vec<String> {
        match self.memory.load(query, self.settings.context_limit).await {
            Ok(context) => context,
            Err(e) => {
                warn!(agent = %self.name, error = %e, "memory load failed; continuing without context");
                Vec::new()
            }
        }
    }

    async fn remember(&self, content: &str, importance: f32, context_type: &str) {
        if let Err(e) = self.memory.save(content, importance, context_type).await {
            warn!(agent = %self.name, error = %e, context_type, "memory save failed");
        }
    }

    fn state(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// BusyGuard
// ---------------------------------------------------------------------------

/// Marks the agent busy on creation and available again on drop, so the
/// status is restored on every exit path including cancellation.
///
/// A queued copy still `InProgress` at drop time was abandoned mid-run and
/// goes back to `Pending`.
struct BusyGuard<'a> {
    agent: &'a Agent,
    task_id: TaskId,
}

impl<'a> BusyGuard<'a> {
    fn enter(agent: &'a Agent, task: &Task) -> Self {
        let mut state = agent.state();
        state.status = AgentStatus::Busy;
        state.current_task = Some(task.clone());
        if let Some(queued) = state.queue.iter_mut().find(|t| t.id == task.id) {
            *queued = task.clone();
        }
        Self {
            agent,
            task_id: task.id,
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.agent.state();
        state.status = AgentStatus::Available;
        state.current_task = None;
        if let Some(queued) = state
            .queue
            .iter_mut()
            .find(|t| t.id == self.task_id && t.status == TaskStatus::InProgress)
        {
            queued.reset_for_retry();
            debug!(agent = %self.agent.name, task_id = %self.task_id, "abandoned task returned to pending");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
