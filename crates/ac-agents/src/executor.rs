//! Work executors: the pluggable, domain-specific half of an agent.
//!
//! The core never interprets what an executor produces. It only hands over
//! the task plus whatever context the agent's memory returned, and records
//! the resulting [`TaskResult`] (or converts an error into a failed one).

use std::sync::Arc;

use ac_core::types::{Task, TaskResult};
use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum WorkExecutionError {
    #[error("work failed: {0}")]
    Failed(String),
    #[error("work timed out after {0}s")]
    Timeout(u64),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, WorkExecutionError>;

// ---------------------------------------------------------------------------
// WorkExecutor
// ---------------------------------------------------------------------------

/// Produces the outcome of a task. Errors are absorbed by the calling agent
/// and never reach the agent's caller.
#[async_trait]
pub trait WorkExecutor: Send + Sync {
    async fn execute(&self, agent_name: &str, task: &Task, context: &[String])
        -> Result<TaskResult>;
}

// ---------------------------------------------------------------------------
// GenericExecutor
// ---------------------------------------------------------------------------

/// Fallback executor that acknowledges the work without producing any
/// domain content.
#[derive(Debug, Default, Clone)]
pub struct GenericExecutor;

#[async_trait]
impl WorkExecutor for GenericExecutor {
    async fn execute(
        &self,
        agent_name: &str,
        task: &Task,
        context: &[String],
    ) -> Result<TaskResult> {
        let trace = format!(
            "Generic execution by {agent_name}\nTask: {}\nDescription: {}\nPriority: {}\nContext loaded: {} relevant memories",
            task.title,
            task.description,
            task.priority,
            context.len()
        );
        let output = json!({
            "status": "completed",
            "agent": agent_name,
            "task": task.title,
            "context_used": context.len(),
        });
        Ok(TaskResult::done(task.id, agent_name, output, trace)
            .with_next_steps("assign to a specialised agent for domain output"))
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Decides whether a task description belongs to a route.
pub trait Matcher: Send + Sync {
    fn matches(&self, description: &str) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, description: &str) -> bool {
        self(description)
    }
}

/// Matches when any keyword occurs in the description, ignoring case.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Matcher for KeywordMatcher {
    fn matches(&self, description: &str) -> bool {
        let lower = description.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// One row of a [`RoutingExecutor`] table.
pub struct Route {
    pub kind: String,
    matcher: Box<dyn Matcher>,
    executor: Arc<dyn WorkExecutor>,
}

impl Route {
    pub fn new(
        kind: impl Into<String>,
        matcher: impl Matcher + 'static,
        executor: Arc<dyn WorkExecutor>,
    ) -> Self {
        Self {
            kind: kind.into(),
            matcher: Box::new(matcher),
            executor,
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("kind", &self.kind).finish()
    }
}

/// Dispatches a task to the first route whose matcher accepts the task
/// description, or to the fallback executor when none does.
///
/// The chosen route kind is recorded under `"work_kind"` in the result
/// output when the output is a JSON object.
pub struct RoutingExecutor {
    routes: Vec<Route>,
    fallback: Arc<dyn WorkExecutor>,
}

impl RoutingExecutor {
    pub fn new(fallback: Arc<dyn WorkExecutor>) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Return the kind of the first matching route.
    pub fn classify(&self, description: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.matcher.matches(description))
            .map(|r| r.kind.as_str())
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

#[async_trait]
impl WorkExecutor for RoutingExecutor {
    async fn execute(
        &self,
        agent_name: &str,
        task: &Task,
        context: &[String],
    ) -> Result<TaskResult> {
        let route = self
            .routes
            .iter()
            .find(|r| r.matcher.matches(&task.description));

        let (kind, executor) = match route {
            Some(r) => (r.kind.as_str(), &r.executor),
            None => ("general", &self.fallback),
        };
        tracing::debug!(agent = %agent_name, task_id = %task.id, kind, "routing task");

        let mut result = executor.execute(agent_name, task, context).await?;
        if let Some(serde_json::Value::Object(map)) = result.output.as_mut() {
            map.insert("work_kind".into(), json!(kind));
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Tagged(&'static str);

    #[async_trait]
    impl WorkExecutor for Tagged {
        async fn execute(&self, agent: &str, task: &Task, _ctx: &[String]) -> Result<TaskResult> {
            Ok(TaskResult::done(task.id, agent, json!({ "by": self.0 }), self.0))
        }
    }

    fn router() -> RoutingExecutor {
        RoutingExecutor::new(Arc::new(GenericExecutor))
            .route(Route::new(
                "financial",
                KeywordMatcher::new(["revenue", "cash flow"]),
                Arc::new(Tagged("fin")),
            ))
            .route(Route::new(
                "legal",
                |d: &str| d.contains("contract"),
                Arc::new(Tagged("legal")),
            ))
    }

    #[test]
    fn keyword_matcher_ignores_case() {
        let m = KeywordMatcher::new(["Revenue"]);
        assert!(m.matches("check REVENUE trends"));
        assert!(!m.matches("check margins"));
    }

    #[test]
    fn classify_picks_first_matching_route() {
        let r = router();
        assert_eq!(r.classify("Cash flow and contract review"), Some("financial"));
        assert_eq!(r.classify("review the contract"), Some("legal"));
        assert_eq!(r.classify("draw a diagram"), None);
        assert_eq!(r.route_count(), 2);
    }

    #[tokio::test]
    async fn routing_records_work_kind() {
        let r = router();
        let task = Task::new("t", "quarterly revenue");
        let result = r.execute("marcus", &task, &[]).await.unwrap();
        let output = result.output.unwrap();
        assert_eq!(output["by"], json!("fin"));
        assert_eq!(output["work_kind"], json!("financial"));
    }

    #[tokio::test]
    async fn unmatched_task_uses_fallback() {
        let r = router();
        let task = Task::new("t", "something else");
        let result = r.execute("lucas", &task, &["m".into()]).await.unwrap();
        let output = result.output.unwrap();
        assert_eq!(output["work_kind"], json!("general"));
        assert_eq!(output["context_used"], json!(1));
    }

    #[tokio::test]
    async fn generic_executor_reports_agent_and_task() {
        let task = Task::new("Summarise", "notes");
        let result = GenericExecutor.execute("maya", &task, &[]).await.unwrap();
        assert!(result.is_done());
        assert_eq!(result.completed_by, "maya");
        assert_eq!(result.task_id, task.id);
        assert!(result.reasoning_trace.contains("Summarise"));
    }
}
