use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ac_agents::agent::{Agent, AgentSettings, TIMEOUT_MARKER};
use ac_agents::executor::{WorkExecutionError, WorkExecutor};
use ac_agents::memory::{InMemoryMemory, MemoryError, MemoryProvider, SaveOutcome};
use ac_core::config::FailedTaskPolicy;
use ac_core::types::{AgentStatus, Priority, Task, TaskResult, TaskStatus};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// Scripted executors
// ---------------------------------------------------------------------------

struct AlwaysErr;

#[async_trait]
impl WorkExecutor for AlwaysErr {
    async fn execute(
        &self,
        _agent: &str,
        _task: &Task,
        _ctx: &[String],
    ) -> ac_agents::executor::Result<TaskResult> {
        Err(WorkExecutionError::Failed("disk on fire".into()))
    }
}

struct ReportsFailure;

#[async_trait]
impl WorkExecutor for ReportsFailure {
    async fn execute(
        &self,
        agent: &str,
        task: &Task,
        _ctx: &[String],
    ) -> ac_agents::executor::Result<TaskResult> {
        Ok(TaskResult::failed(task.id, agent, "source data missing"))
    }
}

struct Slow(Duration);

#[async_trait]
impl WorkExecutor for Slow {
    async fn execute(
        &self,
        agent: &str,
        task: &Task,
        _ctx: &[String],
    ) -> ac_agents::executor::Result<TaskResult> {
        tokio::time::sleep(self.0).await;
        Ok(TaskResult::done(task.id, agent, json!({}), "slow work"))
    }
}

/// Signals when execution starts and waits to be released.
struct Gated {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl WorkExecutor for Gated {
    async fn execute(
        &self,
        agent: &str,
        task: &Task,
        _ctx: &[String],
    ) -> ac_agents::executor::Result<TaskResult> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(TaskResult::done(task.id, agent, json!({}), "gated"))
    }
}

/// Tracks how many executions overlap.
#[derive(Default)]
struct Overlap {
    current: AtomicUsize,
    max: AtomicUsize,
}

#[async_trait]
impl WorkExecutor for Overlap {
    async fn execute(
        &self,
        agent: &str,
        task: &Task,
        _ctx: &[String],
    ) -> ac_agents::executor::Result<TaskResult> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(TaskResult::done(task.id, agent, json!({}), "overlap"))
    }
}

struct BrokenMemory;

#[async_trait]
impl MemoryProvider for BrokenMemory {
    async fn save(
        &self,
        _content: &str,
        _importance: f32,
        _context_type: &str,
    ) -> ac_agents::memory::Result<SaveOutcome> {
        Err(MemoryError::Unavailable("offline".into()))
    }

    async fn load(&self, _query: &str, _limit: usize) -> ac_agents::memory::Result<Vec<String>> {
        Err(MemoryError::Unavailable("offline".into()))
    }
}

fn assert_result_invariant(task: &Task) {
    assert_eq!(
        task.result.is_some(),
        task.status.carries_result(),
        "task {} in {} has result: {}",
        task.id,
        task.status,
        task.result.is_some()
    );
}

// ---------------------------------------------------------------------------
// Failure path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn executor_error_becomes_failed_result() {
    let agent = Agent::new("helena", "Analyst", "legal research").with_executor(Arc::new(AlwaysErr));
    let mut task = Task::new("Review", "contract review");
    agent.receive_task(task.clone()).await;

    let result = agent.process_task(&mut task).await;

    assert!(!result.is_done());
    assert!(result.output.is_none());
    assert!(result.artifacts.is_empty());
    assert!(result.reasoning_trace.contains("disk on fire"));
    assert_eq!(result.next_steps.as_deref(), Some("review error and retry"));
    assert_eq!(task.status, TaskStatus::Failed);
    assert_result_invariant(&task);

    let report = agent.report_status();
    assert_eq!(report.tasks_failed, 1);
    assert_eq!(report.tasks_completed, 0);
    assert_eq!(report.status, AgentStatus::Available);

    // Failed tasks stay visible in the agent's queue.
    let queued = agent.queue_snapshot();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].status, TaskStatus::Failed);
}

#[tokio::test]
async fn executor_reported_failure_counts_as_failure() {
    let agent = Agent::new("a", "r", "s").with_executor(Arc::new(ReportsFailure));
    let mut task = Task::new("t", "d");
    agent.receive_task(task.clone()).await;

    let result = agent.process_task(&mut task).await;
    assert_eq!(result.reasoning_trace, "source data missing");
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(agent.report_status().tasks_failed, 1);
}

#[tokio::test]
async fn dequeue_policy_drops_failed_tasks() {
    let settings = AgentSettings {
        failed_task_policy: FailedTaskPolicy::Dequeue,
        ..AgentSettings::default()
    };
    let agent = Agent::new("a", "r", "s")
        .with_executor(Arc::new(AlwaysErr))
        .with_settings(settings);
    let mut task = Task::new("t", "d");
    agent.receive_task(task.clone()).await;
    agent.process_task(&mut task).await;
    assert_eq!(agent.queue_len(), 0);
}

#[tokio::test]
async fn requeue_failed_restores_pending() {
    let agent = Agent::new("a", "r", "s").with_executor(Arc::new(AlwaysErr));
    let mut task = Task::new("t", "d");
    agent.receive_task(task.clone()).await;
    agent.process_task(&mut task).await;

    agent.requeue_failed(task.id).unwrap();
    let snapshot = agent.queue_snapshot();
    let queued = &snapshot[0];
    assert_eq!(queued.status, TaskStatus::Pending);
    assert!(queued.result.is_none());
    assert!(queued.completed_at.is_none());
    assert_result_invariant(queued);

    // A second requeue is refused: the task is no longer failed.
    assert!(agent.requeue_failed(task.id).is_err());
}

#[tokio::test]
async fn timeout_yields_marked_failure() {
    let settings = AgentSettings {
        execution_timeout: Some(Duration::from_millis(20)),
        ..AgentSettings::default()
    };
    let agent = Agent::new("a", "r", "s")
        .with_executor(Arc::new(Slow(Duration::from_secs(5))))
        .with_settings(settings);
    let mut task = Task::new("t", "d");

    let result = agent.process_task(&mut task).await;
    assert!(result.reasoning_trace.starts_with(TIMEOUT_MARKER));
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(agent.status(), AgentStatus::Available);
}

// ---------------------------------------------------------------------------
// Status and concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn agent_is_busy_only_while_processing() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let agent = Arc::new(Agent::new("a", "r", "s").with_executor(Arc::new(Gated {
        started: started.clone(),
        release: release.clone(),
    })));
    assert_eq!(agent.status(), AgentStatus::Available);

    let worker = agent.clone();
    let run = tokio::spawn(async move {
        let mut task = Task::new("gated", "d");
        worker.process_task(&mut task).await
    });

    started.notified().await;
    assert_eq!(agent.status(), AgentStatus::Busy);
    assert_eq!(agent.report_status().current_task.as_deref(), Some("gated"));

    release.notify_one();
    let result = run.await.unwrap();
    assert!(result.is_done());
    assert_eq!(agent.status(), AgentStatus::Available);
    assert!(agent.current_task().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_never_overlap() {
    let overlap = Arc::new(Overlap::default());
    let agent = Arc::new(Agent::new("a", "r", "s").with_executor(overlap.clone()));

    let mut handles = Vec::new();
    for i in 0..6 {
        let agent = agent.clone();
        handles.push(tokio::spawn(async move {
            let mut task = Task::new(format!("t{i}"), "d");
            agent.process_task(&mut task).await
        }));
    }
    for h in handles {
        assert!(h.await.unwrap().is_done());
    }

    assert_eq!(overlap.max.load(Ordering::SeqCst), 1);
    assert_eq!(agent.report_status().tasks_completed, 6);
}

#[tokio::test]
async fn cancelled_processing_restores_availability() {
    let agent = Agent::new("a", "r", "s").with_executor(Arc::new(Slow(Duration::from_secs(5))));
    let mut task = Task::new("t", "d");
    let outcome = tokio::time::timeout(Duration::from_millis(20), agent.process_task(&mut task)).await;
    assert!(outcome.is_err());
    assert_eq!(agent.status(), AgentStatus::Available);
    assert!(agent.current_task().is_none());
}

#[tokio::test]
async fn cancelled_process_next_returns_task_to_pending() {
    let agent = Agent::new("a", "r", "s").with_executor(Arc::new(Slow(Duration::from_secs(5))));
    let task = Task::new("t", "d");
    let id = task.id;
    agent.receive_task(task).await;

    let outcome = tokio::time::timeout(Duration::from_millis(20), agent.process_next()).await;
    assert!(outcome.is_err());

    let queued = agent.queue_snapshot();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id, id);
    assert_eq!(queued[0].status, TaskStatus::Pending);
    assert!(queued[0].started_at.is_none());

    // The abandoned task is schedulable again.
    let fast = Agent::new("b", "r", "s");
    fast.receive_task(queued[0].clone()).await;
    assert!(fast.process_next().await.is_some());
}

// ---------------------------------------------------------------------------
// Ordering and memory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn process_next_follows_priority_then_arrival() {
    let agent = Agent::new("a", "r", "s");
    for (title, p) in [("low", Priority::LOW), ("high-1", Priority::HIGH), ("high-2", Priority::HIGH)] {
        agent.receive_task(Task::new(title, "d").with_priority(p)).await;
    }

    let mut order = Vec::new();
    while let Some(result) = agent.process_next().await {
        let title = result.output.unwrap()["task"].as_str().unwrap().to_string();
        order.push(title);
    }
    assert_eq!(order, vec!["high-1", "high-2", "low"]);
    assert_eq!(agent.queue_len(), 0);
}

#[tokio::test]
async fn memory_records_receipt_and_completion() {
    let memory = Arc::new(InMemoryMemory::new());
    let agent = Agent::new("a", "r", "s").with_memory(memory.clone());
    let mut task = Task::new("Forecast", "quarterly revenue forecast");
    agent.receive_task(task.clone()).await;
    agent.process_task(&mut task).await;

    let entries = memory.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].context_type, "task_received");
    assert_eq!(entries[0].importance, 0.7);
    assert_eq!(entries[1].context_type, "task_completed");
    assert_eq!(entries[1].importance, 0.85);
    assert!(entries[1].content.starts_with("Completed task: Forecast"));
}

#[tokio::test]
async fn memory_context_reaches_the_executor() {
    let memory = Arc::new(InMemoryMemory::new());
    memory.save("revenue grew last quarter", 0.9, "note").await.unwrap();
    let agent = Agent::new("a", "r", "s").with_memory(memory);
    let mut task = Task::new("t", "revenue outlook");

    let result = agent.process_task(&mut task).await;
    assert_eq!(result.output.unwrap()["context_used"], json!(1));
}

#[tokio::test]
async fn broken_memory_is_not_fatal() {
    let agent = Agent::new("a", "r", "s").with_memory(Arc::new(BrokenMemory));
    let mut task = Task::new("t", "d");
    agent.receive_task(task.clone()).await;
    let result = agent.process_task(&mut task).await;
    assert!(result.is_done());
    assert_result_invariant(&task);
}
