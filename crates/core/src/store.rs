//! Result store seam and the in-memory implementation.
//!
//! The store bridges webhook arrival and frontend polling. It is a cache,
//! not the system of record: entries expire after a TTL and readers treat
//! expired entries as absent.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::task_result::TaskResult;
use crate::types::Timestamp;

/// Default time-to-live for cached results: 30 minutes.
pub const DEFAULT_TTL_SECS: i64 = 30 * 60;

/// What a [`ResultStore::put`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The entry was written (inserted or overwritten).
    Stored,
    /// A `Processing` write hit a live terminal entry and was dropped.
    IgnoredRegression,
}

/// Diagnostic view over live entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub count: usize,
    pub keys: Vec<String>,
}

/// Key-value store from task ID to [`TaskResult`] with TTL expiry.
///
/// Implementations must be safe under interleaved callback and poll
/// requests touching the same key.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Short backend name for health output.
    fn backend(&self) -> &'static str;

    /// Overwrite the entry for `result.task_id`, unless that would move a
    /// live terminal entry back to `Processing`.
    async fn put(&self, result: TaskResult) -> Result<PutOutcome, CoreError>;

    /// Live entry for `task_id` at `now`. Expired entries are evicted and
    /// reported as absent.
    async fn get(&self, task_id: &str, now: Timestamp) -> Result<Option<TaskResult>, CoreError>;

    /// Physically remove every entry expired at `now`; returns the count.
    async fn purge_expired(&self, now: Timestamp) -> Result<u64, CoreError>;

    /// Count and keys of live entries at `now`.
    async fn stats(&self, now: Timestamp) -> Result<StoreStats, CoreError>;

    /// Whether the backing storage is reachable.
    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryResultStore
// ---------------------------------------------------------------------------

/// Process-local store. Loses everything on restart.
pub struct MemoryResultStore {
    entries: RwLock<HashMap<String, TaskResult>>,
    ttl: chrono::Duration,
}

impl MemoryResultStore {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for MemoryResultStore {
    fn default() -> Self {
        Self::new(chrono::Duration::seconds(DEFAULT_TTL_SECS))
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, result: TaskResult) -> Result<PutOutcome, CoreError> {
        let mut entries = self.entries.write().await;

        let now = result.recorded_at;
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));

        if let Some(existing) = entries.get(&result.task_id) {
            if !existing.status.accepts(result.status) {
                return Ok(PutOutcome::IgnoredRegression);
            }
        }

        entries.insert(result.task_id.clone(), result);
        Ok(PutOutcome::Stored)
    }

    async fn get(&self, task_id: &str, now: Timestamp) -> Result<Option<TaskResult>, CoreError> {
        {
            let entries = self.entries.read().await;
            match entries.get(task_id) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now, self.ttl) => return Ok(Some(entry.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(task_id)
            .is_some_and(|entry| entry.is_expired(now, self.ttl))
        {
            entries.remove(task_id);
        }
        Ok(None)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, CoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        Ok((before - entries.len()) as u64)
    }

    async fn stats(&self, now: Timestamp) -> Result<StoreStats, CoreError> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .values()
            .filter(|entry| !entry.is_expired(now, self.ttl))
            .map(|entry| entry.task_id.clone())
            .collect();
        keys.sort();

        Ok(StoreStats {
            count: keys.len(),
            keys,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
