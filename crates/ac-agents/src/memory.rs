//! Memory providers: best-effort context storage consulted by agents.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory backend unavailable: {0}")]
    Unavailable(String),
    #[error("memory error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// Outcome of a [`MemoryProvider::save`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub success: bool,
}

/// Context store used by agents before and after executing work.
///
/// Agents treat every failure as non-fatal: errors are logged and the task
/// proceeds with whatever context was obtained.
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    async fn save(&self, content: &str, importance: f32, context_type: &str)
        -> Result<SaveOutcome>;

    async fn load(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// NullMemory
// ---------------------------------------------------------------------------

/// Stores nothing and recalls nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMemory;

#[async_trait]
impl MemoryProvider for NullMemory {
    async fn save(&self, _content: &str, _importance: f32, _context_type: &str) -> Result<SaveOutcome> {
        Ok(SaveOutcome { success: false })
    }

    async fn load(&self, _query: &str, _limit: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// InMemoryMemory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub content: String,
    pub importance: f32,
    pub context_type: String,
    pub saved_at: DateTime<Utc>,
}

/// Process-local memory with keyword recall.
///
/// `load` returns entries sharing at least one word (3+ characters, case
/// insensitive) with the query, most important first, newest first among
/// equally important entries.
#[derive(Debug, Default)]
pub struct InMemoryMemory {
    entries: Mutex<Vec<MemoryEntry>>,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MemoryEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
}

#[async_trait]
impl MemoryProvider for InMemoryMemory {
    async fn save(&self, content: &str, importance: f32, context_type: &str) -> Result<SaveOutcome> {
        let entry = MemoryEntry {
            content: content.to_string(),
            importance: importance.clamp(0.0, 1.0),
            context_type: context_type.to_string(),
            saved_at: Utc::now(),
        };
        self.lock().push(entry);
        Ok(SaveOutcome { success: true })
    }

    async fn load(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let terms: Vec<String> = words(query).collect();
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self.lock();
        let mut hits: Vec<(usize, &MemoryEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                let lower = e.content.to_lowercase();
                terms.iter().any(|t| lower.contains(t.as_str()))
            })
            .collect();

        hits.sort_by(|(ia, a), (ib, b)| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ib.cmp(ia))
        });

        Ok(hits
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.content.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_memory_is_empty() {
        let m = NullMemory;
        assert!(!m.save("x", 0.5, "t").await.unwrap().success);
        assert!(m.load("x", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_clamps_importance() {
        let m = InMemoryMemory::new();
        m.save("alpha", 3.0, "note").await.unwrap();
        m.save("beta", -1.0, "note").await.unwrap();
        let entries = m.entries();
        assert_eq!(entries[0].importance, 1.0);
        assert_eq!(entries[1].importance, 0.0);
    }

    #[tokio::test]
    async fn load_ranks_by_importance_then_recency() {
        let m = InMemoryMemory::new();
        m.save("Received task: revenue review", 0.7, "task_received").await.unwrap();
        m.save("Completed task: contract audit", 0.85, "task_completed").await.unwrap();
        m.save("Completed task: revenue forecast", 0.85, "task_completed").await.unwrap();
        m.save("Received task: revenue rerun", 0.7, "task_received").await.unwrap();

        let hits = m.load("Revenue numbers", 5).await.unwrap();
        assert_eq!(
            hits,
            vec![
                "Completed task: revenue forecast".to_string(),
                "Received task: revenue rerun".to_string(),
                "Received task: revenue review".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn load_respects_limit_and_short_queries() {
        let m = InMemoryMemory::new();
        for i in 0..4 {
            m.save(&format!("report {i}"), 0.5, "note").await.unwrap();
        }
        assert_eq!(m.load("report", 2).await.unwrap().len(), 2);
        assert!(m.load("a b", 5).await.unwrap().is_empty());
        assert!(m.load("report", 0).await.unwrap().is_empty());
    }
}
