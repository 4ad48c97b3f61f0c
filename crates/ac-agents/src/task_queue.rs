//! Shared task store with per-agent views.
//!
//! The queue owns every [`Task`] it has seen. Per-agent views hold ids only,
//! so a status change through any entry point is visible everywhere.

use std::collections::HashMap;

use ac_core::types::{Task, TaskId, TaskResult, TaskStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskQueueError {
    #[error("task {0} already queued")]
    DuplicateTask(TaskId),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
}

pub type Result<T> = std::result::Result<T, TaskQueueError>;

// ---------------------------------------------------------------------------
// QueueStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub done: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl QueueStats {
    fn count(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Blocked => self.blocked += 1,
            TaskStatus::Done => self.done += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn for_status(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Blocked => self.blocked,
            TaskStatus::Done => self.done,
            TaskStatus::Failed => self.failed,
            TaskStatus::Cancelled => self.cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskQueue
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct QueuedTask {
    /// Insertion order, used to break priority ties.
    seq: u64,
    task: Task,
}

#[derive(Debug, Default)]
struct QueueInner {
    next_seq: u64,
    tasks: HashMap<TaskId, QueuedTask>,
    agent_tasks: HashMap<String, Vec<TaskId>>,
}

impl QueueInner {
    fn task_mut(&mut self, task_id: TaskId) -> Result<&mut Task> {
        self.tasks
            .get_mut(&task_id)
            .map(|q| &mut q.task)
            .ok_or(TaskQueueError::TaskNotFound(task_id))
    }

    fn ordered(&self) -> Vec<&QueuedTask> {
        let mut all: Vec<&QueuedTask> = self.tasks.values().collect();
        all.sort_by_key(|q| q.seq);
        all
    }
}

/// Priority task store shared by a team's agents.
#[derive(Debug, Default)]
pub struct TaskQueue {
    inner: RwLock<QueueInner>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a task. The task is not assigned to anyone yet.
    pub async fn add_task(&self, task: Task) -> Result<TaskId> {
        let mut inner = self.inner.write().await;
        let id = task.id;
        if inner.tasks.contains_key(&id) {
            return Err(TaskQueueError::DuplicateTask(id));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        debug!(task_id = %id, priority = %task.priority, "task queued");
        inner.tasks.insert(id, QueuedTask { seq, task });
        Ok(id)
    }

    /// Assign a stored task to `agent_name` and add it to that agent's view.
    ///
    /// Assigning the same task twice lists it twice in the view.
    pub async fn assign_to_agent(&self, task_id: TaskId, agent_name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.task_mut(task_id)?.assigned_to = Some(agent_name.to_string());
        inner
            .agent_tasks
            .entry(agent_name.to_string())
            .or_default()
            .push(task_id);
        debug!(task_id = %task_id, agent = agent_name, "task assigned");
        Ok(())
    }

    /// Highest-priority pending task in the agent's view; the earliest
    /// queued task wins ties.
    pub async fn get_next_for_agent(&self, agent_name: &str) -> Option<Task> {
        let inner = self.inner.read().await;
        let ids = inner.agent_tasks.get(agent_name)?;

        ids.iter()
            .filter_map(|id| inner.tasks.get(id))
            .filter(|q| q.task.is_schedulable())
            .min_by(|a, b| {
                b.task
                    .priority
                    .cmp(&a.task.priority)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|q| q.task.clone())
    }

    /// Overwrite a task's status. No transition checks are applied here.
    ///
    /// `started_at` is stamped on the first entry into `InProgress` and
    /// `completed_at` on the first entry into a terminal state.
    pub async fn update_status(&self, task_id: TaskId, status: TaskStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let task = inner.task_mut(task_id)?;
        if status == TaskStatus::InProgress && task.started_at.is_none() {
            task.started_at = Some(Utc::now());
        }
        if status.is_terminal() && !task.status.is_terminal() {
            task.completed_at = Some(Utc::now());
        }
        task.status = status;
        debug!(task_id = %task_id, %status, "task status updated");
        Ok(())
    }

    /// Attach a result and adopt its status. A later call replaces an
    /// earlier result.
    pub async fn complete_task(&self, task_id: TaskId, result: TaskResult) -> Result<()> {
        let mut inner = self.inner.write().await;
        let task = inner.task_mut(task_id)?;
        task.finish(result);
        info!(task_id = %task_id, status = %task.status, "task completed");
        Ok(())
    }

    /// Every task in the agent's view, in assignment order.
    pub async fn get_agent_tasks(&self, agent_name: &str) -> Vec<Task> {
        let inner = self.inner.read().await;
        inner
            .agent_tasks
            .get(agent_name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.tasks.get(id))
                    .map(|q| q.task.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn get_blocked_tasks(&self) -> Vec<Task> {
        self.with_status(TaskStatus::Blocked).await
    }

    pub async fn get_pending_tasks(&self) -> Vec<Task> {
        self.with_status(TaskStatus::Pending).await
    }

    pub async fn get_task(&self, task_id: TaskId) -> Option<Task> {
        let inner = self.inner.read().await;
        inner.tasks.get(&task_id).map(|q| q.task.clone())
    }

    /// Finished tasks (done or failed), most recently completed first.
    pub async fn get_task_history(&self, limit: usize) -> Vec<Task> {
        let inner = self.inner.read().await;
        let mut finished: Vec<&QueuedTask> = inner
            .tasks
            .values()
            .filter(|q| q.task.status.carries_result())
            .collect();
        finished.sort_by(|a, b| {
            b.task
                .completed_at
                .cmp(&a.task.completed_at)
                .then(b.seq.cmp(&a.seq))
        });
        finished
            .into_iter()
            .take(limit)
            .map(|q| q.task.clone())
            .collect()
    }

    pub async fn get_stats(&self) -> QueueStats {
        let inner = self.inner.read().await;
        let mut stats = QueueStats::default();
        for q in inner.tasks.values() {
            stats.count(q.task.status);
        }
        stats
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn with_status(&self, status: TaskStatus) -> Vec<Task> {
        let inner = self.inner.read().await;
        inner
            .ordered()
            .into_iter()
            .filter(|q| q.task.status == status)
            .map(|q| q.task.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::types::Priority;

    fn task(title: &str, priority: Priority) -> Task {
        Task::new(title, "d").with_priority(priority)
    }

    #[tokio::test]
    async fn add_rejects_duplicates() {
        let q = TaskQueue::new();
        let t = task("a", Priority::LOW);
        let id = q.add_task(t.clone()).await.unwrap();
        assert_eq!(q.add_task(t).await, Err(TaskQueueError::DuplicateTask(id)));
        assert_eq!(q.len().await, 1);
    }

    #[tokio::test]
    async fn added_task_is_not_assigned() {
        let q = TaskQueue::new();
        let id = q.add_task(task("a", Priority::LOW)).await.unwrap();
        assert!(q.get_task(id).await.unwrap().assigned_to.is_none());
        assert!(q.get_agent_tasks("anyone").await.is_empty());
    }

    #[tokio::test]
    async fn assign_unknown_task_fails() {
        let q = TaskQueue::new();
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            q.assign_to_agent(id, "kai").await,
            Err(TaskQueueError::TaskNotFound(id))
        );
    }

    #[tokio::test]
    async fn next_for_agent_skips_non_pending() {
        let q = TaskQueue::new();
        let hi = q.add_task(task("hi", Priority::CRITICAL)).await.unwrap();
        let lo = q.add_task(task("lo", Priority::LOW)).await.unwrap();
        q.assign_to_agent(hi, "kai").await.unwrap();
        q.assign_to_agent(lo, "kai").await.unwrap();
        q.update_status(hi, TaskStatus::InProgress).await.unwrap();

        assert_eq!(q.get_next_for_agent("kai").await.unwrap().id, lo);
        assert!(q.get_next_for_agent("nobody").await.is_none());
    }

    #[tokio::test]
    async fn update_status_stamps_completion_once() {
        let q = TaskQueue::new();
        let id = q.add_task(task("a", Priority::MEDIUM)).await.unwrap();
        q.update_status(id, TaskStatus::Cancelled).await.unwrap();
        let first = q.get_task(id).await.unwrap().completed_at;
        assert!(first.is_some());
        q.update_status(id, TaskStatus::Done).await.unwrap();
        assert_eq!(q.get_task(id).await.unwrap().completed_at, first);
    }

    #[tokio::test]
    async fn update_status_stamps_start_once() {
        let q = TaskQueue::new();
        let id = q.add_task(task("a", Priority::MEDIUM)).await.unwrap();
        assert!(q.get_task(id).await.unwrap().started_at.is_none());

        q.update_status(id, TaskStatus::InProgress).await.unwrap();
        let first = q.get_task(id).await.unwrap().started_at;
        assert!(first.is_some());

        q.update_status(id, TaskStatus::Blocked).await.unwrap();
        q.update_status(id, TaskStatus::InProgress).await.unwrap();
        assert_eq!(q.get_task(id).await.unwrap().started_at, first);
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let q = TaskQueue::new();
        let a = q.add_task(task("a", Priority::MEDIUM)).await.unwrap();
        let b = q.add_task(task("b", Priority::MEDIUM)).await.unwrap();
        q.add_task(task("c", Priority::MEDIUM)).await.unwrap();

        q.complete_task(a, TaskResult::done(a, "x", serde_json::json!({}), "ok"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        q.complete_task(b, TaskResult::failed(b, "x", "boom"))
            .await
            .unwrap();

        let history: Vec<TaskId> = q.get_task_history(10).await.into_iter().map(|t| t.id).collect();
        assert_eq!(history, vec![b, a]);
        assert_eq!(q.get_task_history(1).await.len(), 1);
    }
}
