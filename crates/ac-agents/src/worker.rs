//! Per-agent worker: a tokio task that owns the agent's execution loop and
//! is fed through a bounded channel.

use std::sync::Arc;

use ac_core::config::AgentsConfig;
use ac_core::types::{AckStatus, Task, TaskAck, TaskResult};
use flume::{Receiver, Sender, TrySendError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::agent::Agent;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("worker inbox is full")]
    Full,
    #[error("worker has shut down")]
    Closed,
}

pub struct AgentWorker;

impl AgentWorker {
    /// Start a worker for `agent` with an inbox of `capacity` tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(agent: Arc<Agent>, capacity: usize) -> WorkerHandle {
        let (tx, rx) = flume::bounded::<Task>(capacity.max(1));
        let (result_tx, result_rx) = flume::unbounded::<TaskResult>();
        let join = tokio::spawn(run(agent.clone(), rx, result_tx));
        info!(agent = %agent.name(), capacity, "worker started");
        WorkerHandle {
            agent,
            tx: Some(tx),
            results: result_rx,
            join: Some(join),
        }
    }

    /// Start a worker whose inbox size comes from
    /// `agents.worker_channel_capacity`.
    pub fn spawn_configured(agent: Arc<Agent>, cfg: &AgentsConfig) -> WorkerHandle {
        Self::spawn(agent, cfg.worker_channel_capacity)
    }
}

async fn run(agent: Arc<Agent>, inbox: Receiver<Task>, results: Sender<TaskResult>) {
    while let Ok(task) = inbox.recv_async().await {
        agent.receive_task(task).await;
        drain(&agent, &inbox).await;

        while let Some(result) = agent.process_next().await {
            if results.send(result).is_err() {
                debug!(agent = %agent.name(), "result receiver dropped");
            }
            drain(&agent, &inbox).await;
        }
    }
    debug!(agent = %agent.name(), "worker inbox closed");
}

/// Move everything already waiting in the inbox into the agent's queue so
/// that priority ordering applies across the whole backlog.
async fn drain(agent: &Agent, inbox: &Receiver<Task>) {
    while let Ok(task) = inbox.try_recv() {
        agent.receive_task(task).await;
    }
}

pub struct WorkerHandle {
    agent: Arc<Agent>,
    tx: Option<Sender<Task>>,
    results: Receiver<TaskResult>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// Enqueue a task without waiting.
    pub fn submit(&self, task: Task) -> Result<TaskAck, WorkerError> {
        let tx = self.tx.as_ref().ok_or(WorkerError::Closed)?;
        let ack = TaskAck {
            task_id: task.id,
            agent_name: self.agent.name().to_string(),
            ack_status: AckStatus::Acknowledged,
            eta_minutes: self.agent.estimate_eta(&task),
        };
        tx.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => WorkerError::Full,
            TrySendError::Disconnected(_) => WorkerError::Closed,
        })?;
        Ok(ack)
    }

    /// Stream of results in completion order.
    pub fn results(&self) -> Receiver<TaskResult> {
        self.results.clone()
    }

    /// Close the inbox and wait for the worker to finish its backlog.
    pub async fn shutdown(mut self) {
        self.tx.take();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                error!(agent = %self.agent.name(), error = %e, "worker task failed");
            }
        }
        info!(agent = %self.agent.name(), "worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_finishes_backlog() {
        let agent = Arc::new(Agent::new("w", "r", "s"));
        let handle = AgentWorker::spawn(agent.clone(), 8);
        let results = handle.results();
        for i in 0..3 {
            let ack = handle.submit(Task::new(format!("t{i}"), "d")).unwrap();
            assert_eq!(ack.eta_minutes, 30);
        }
        handle.shutdown().await;
        assert_eq!(results.drain().count(), 3);
        assert_eq!(agent.report_status().tasks_completed, 3);
    }
}
