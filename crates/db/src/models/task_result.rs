//! Row model for the `task_results` table.

use dancegen_core::task_result::{TaskResult, TaskStatus};
use dancegen_core::types::Timestamp;
use sqlx::FromRow;

/// A cached task result as stored in PostgreSQL.
#[derive(Debug, Clone, FromRow)]
pub struct TaskResultRow {
    pub task_id: String,
    pub status: String,
    pub result_urls: Vec<String>,
    pub error: Option<String>,
    pub recorded_at: Timestamp,
}

impl TaskResultRow {
    /// Convert into the domain type. Unknown status strings (written by
    /// some other tool) read as `Processing`.
    pub fn into_result(self) -> TaskResult {
        let status = TaskStatus::parse(&self.status).unwrap_or(TaskStatus::Processing);
        TaskResult::with_timestamp(
            self.task_id,
            status,
            self.result_urls,
            self.error,
            self.recorded_at,
        )
    }
}
