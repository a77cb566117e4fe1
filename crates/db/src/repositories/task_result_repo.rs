//! Repository for the `task_results` table.

use dancegen_core::task_result::TaskResult;
use dancegen_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::task_result::TaskResultRow;

/// Column list for `task_results` SELECT queries.
const COLUMNS: &str = "task_id, status, result_urls, error, recorded_at";

/// Provides query operations for cached task results.
pub struct TaskResultRepo;

impl TaskResultRepo {
    /// Insert or overwrite the row for `result.task_id`.
    ///
    /// A `PROCESSING` write does not replace a terminal row recorded at or
    /// after `live_after`. Returns `false` when the write was skipped.
    pub async fn upsert(
        pool: &PgPool,
        result: &TaskResult,
        live_after: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "INSERT INTO task_results (task_id, status, result_urls, error, recorded_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (task_id) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 result_urls = EXCLUDED.result_urls, \
                 error = EXCLUDED.error, \
                 recorded_at = EXCLUDED.recorded_at \
             WHERE NOT (task_results.status IN ('SUCCESS', 'FAILED') \
                        AND EXCLUDED.status = 'PROCESSING' \
                        AND task_results.recorded_at >= $6)",
        )
        .bind(&result.task_id)
        .bind(result.status.as_str())
        .bind(&result.result_urls)
        .bind(&result.error)
        .bind(result.recorded_at)
        .bind(live_after)
        .execute(pool)
        .await?;

        Ok(done.rows_affected() > 0)
    }

    /// Fetch a row by task ID regardless of age.
    pub async fn find(pool: &PgPool, task_id: &str) -> Result<Option<TaskResultRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_results WHERE task_id = $1");
        sqlx::query_as::<_, TaskResultRow>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete one row if it was recorded before `cutoff`.
    pub async fn delete_if_older_than(
        pool: &PgPool,
        task_id: &str,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("DELETE FROM task_results WHERE task_id = $1 AND recorded_at < $2")
            .bind(task_id)
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// Delete every row recorded before `cutoff`.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("DELETE FROM task_results WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// Task IDs of rows recorded at or after `cutoff`, sorted.
    pub async fn list_keys_since(pool: &PgPool, cutoff: Timestamp) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT task_id FROM task_results WHERE recorded_at >= $1 ORDER BY task_id",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }
}
