//! [`ResultStore`] backed by PostgreSQL, so cached results survive restarts.

use async_trait::async_trait;
use dancegen_core::error::CoreError;
use dancegen_core::store::{PutOutcome, ResultStore, StoreStats};
use dancegen_core::task_result::TaskResult;
use dancegen_core::types::Timestamp;

use crate::repositories::TaskResultRepo;
use crate::DbPool;

pub struct PgResultStore {
    pool: DbPool,
    ttl: chrono::Duration,
}

impl PgResultStore {
    pub fn new(pool: DbPool, ttl: chrono::Duration) -> Self {
        Self { pool, ttl }
    }

    fn cutoff(&self, now: Timestamp) -> Timestamp {
        now - self.ttl
    }
}

fn internal(err: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("task result store: {err}"))
}

#[async_trait]
impl ResultStore for PgResultStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn put(&self, result: TaskResult) -> Result<PutOutcome, CoreError> {
        let written = TaskResultRepo::upsert(&self.pool, &result, self.cutoff(result.recorded_at))
            .await
            .map_err(internal)?;

        Ok(if written {
            PutOutcome::Stored
        } else {
            PutOutcome::IgnoredRegression
        })
    }

    async fn get(&self, task_id: &str, now: Timestamp) -> Result<Option<TaskResult>, CoreError> {
        let Some(row) = TaskResultRepo::find(&self.pool, task_id)
            .await
            .map_err(internal)?
        else {
            return Ok(None);
        };

        let result = row.into_result();
        if result.is_expired(now, self.ttl) {
            TaskResultRepo::delete_if_older_than(&self.pool, task_id, self.cutoff(now))
                .await
                .map_err(internal)?;
            return Ok(None);
        }

        Ok(Some(result))
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, CoreError> {
        TaskResultRepo::delete_older_than(&self.pool, self.cutoff(now))
            .await
            .map_err(internal)
    }

    async fn stats(&self, now: Timestamp) -> Result<StoreStats, CoreError> {
        let keys = TaskResultRepo::list_keys_since(&self.pool, self.cutoff(now))
            .await
            .map_err(internal)?;
        Ok(StoreStats {
            count: keys.len(),
            keys,
        })
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(internal)
    }
}
