use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a [`Task`].
pub type TaskId = Uuid;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    /// Waiting on dependencies; set by callers, never by the core.
    Blocked,
    Done,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Done,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    /// Returns `true` when a transition from `self` to `target` is valid.
    ///
    /// Valid transitions:
    /// - Pending    -> InProgress | Blocked | Cancelled
    /// - Blocked    -> Pending | Cancelled
    /// - InProgress -> Done | Failed | Cancelled
    /// - Failed     -> Pending (explicit retry)
    pub fn can_transition_to(&self, target: &TaskStatus) -> bool {
        matches!(
            (self, target),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::Pending, TaskStatus::Blocked)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Blocked, TaskStatus::Pending)
                | (TaskStatus::Blocked, TaskStatus::Cancelled)
                | (TaskStatus::InProgress, TaskStatus::Done)
                | (TaskStatus::InProgress, TaskStatus::Failed)
                | (TaskStatus::InProgress, TaskStatus::Cancelled)
                | (TaskStatus::Failed, TaskStatus::Pending)
        )
    }

    /// Terminal states: no further work happens without an explicit retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// States that must carry a [`TaskResult`].
    pub fn carries_result(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PriorityError {
    #[error("priority {0} is out of range (expected 1..=5)")]
    OutOfRange(u8),
}

/// Task urgency from 1 (low) to 5 (critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const LOW: Priority = Priority(1);
    pub const MEDIUM: Priority = Priority(3);
    pub const HIGH: Priority = Priority(4);
    pub const CRITICAL: Priority = Priority(5);

    pub fn new(value: u8) -> Result<Self, PriorityError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PriorityError::OutOfRange(value))
        }
    }

    /// Map a human label to a priority. Unknown labels fall back to MEDIUM.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Self::LOW,
            "medium" => Self::MEDIUM,
            "high" => Self::HIGH,
            "critical" => Self::CRITICAL,
            _ => Self::MEDIUM,
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl TryFrom<u8> for Priority {
    type Error = PriorityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TaskResult
// ---------------------------------------------------------------------------

/// Final status recorded on a [`TaskResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Done,
    Failed,
}

impl From<ResultStatus> for TaskStatus {
    fn from(s: ResultStatus) -> Self {
        match s {
            ResultStatus::Done => TaskStatus::Done,
            ResultStatus::Failed => TaskStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub completed_by: String,
    pub status: ResultStatus,
    /// Domain payload; never interpreted by the core.
    pub output: Option<serde_json::Value>,
    pub reasoning_trace: String,
    pub time_taken_seconds: f64,
    pub artifacts: Vec<String>,
    pub next_steps: Option<String>,
}

impl TaskResult {
    pub fn done(
        task_id: TaskId,
        completed_by: impl Into<String>,
        output: serde_json::Value,
        reasoning_trace: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            completed_by: completed_by.into(),
            status: ResultStatus::Done,
            output: Some(output),
            reasoning_trace: reasoning_trace.into(),
            time_taken_seconds: 0.0,
            artifacts: Vec::new(),
            next_steps: None,
        }
    }

    pub fn failed(
        task_id: TaskId,
        completed_by: impl Into<String>,
        reasoning_trace: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            completed_by: completed_by.into(),
            status: ResultStatus::Failed,
            output: None,
            reasoning_trace: reasoning_trace.into(),
            time_taken_seconds: 0.0,
            artifacts: Vec::new(),
            next_steps: None,
        }
    }

    pub fn with_time_taken(mut self, seconds: f64) -> Self {
        self.time_taken_seconds = seconds.max(0.0);
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_next_steps(mut self, next_steps: impl Into<String>) -> Self {
        self.next_steps = Some(next_steps.into());
        self
    }

    pub fn is_done(&self) -> bool {
        self.status == ResultStatus::Done
    }
}

// ---------------------------------------------------------------------------
// TaskAck
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Acknowledged,
    Rejected,
}

/// Receipt returned synchronously when an agent takes a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAck {
    pub task_id: TaskId,
    pub agent_name: String,
    pub ack_status: AckStatus,
    pub eta_minutes: u32,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub assigned_to: Option<String>,
    pub assigned_by: String,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub result: Option<TaskResult>,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
}

impl Task {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            assigned_to: None,
            assigned_by: String::new(),
            context: HashMap::new(),
            priority: Priority::default(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            deadline: None,
            result: None,
            dependencies: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn assigned_to(mut self, agent: impl Into<String>) -> Self {
        self.assigned_to = Some(agent.into());
        self
    }

    pub fn assigned_by(mut self, origin: impl Into<String>) -> Self {
        self.assigned_by = origin.into();
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn depends_on(mut self, task_id: TaskId) -> Self {
        self.dependencies.push(task_id);
        self
    }

    /// A task is schedulable only while it is pending.
    pub fn is_schedulable(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move into `InProgress`, stamping `started_at`.
    pub fn start(&mut self) {
        self.status = TaskStatus::InProgress;
        self.started_at = Some(Utc::now());
    }

    /// Attach `result` and adopt its status. `completed_at` is stamped only on
    /// the first entry into a terminal state.
    pub fn finish(&mut self, result: TaskResult) {
        if !self.status.is_terminal() || self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
        self.status = result.status.into();
        self.result = Some(result);
    }

    /// Return a failed task to `Pending`, dropping its result.
    pub fn reset_for_retry(&mut self) {
        self.status = TaskStatus::Pending;
        self.result = None;
        self.started_at = None;
        self.completed_at = None;
    }
}

// ---------------------------------------------------------------------------
// AgentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Available,
    Busy,
    Offline,
    Error,
}

impl AgentStatus {
    pub fn glyph(&self) -> &'static str {
        match self {
            AgentStatus::Available => "*",
            AgentStatus::Busy => "@",
            AgentStatus::Offline => "x",
            AgentStatus::Error => "!",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentStatus::Available => "available",
            AgentStatus::Busy => "busy",
            AgentStatus::Offline => "offline",
            AgentStatus::Error => "error",
        };
        f.write_str(label)
    }
}
