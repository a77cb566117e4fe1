//! Domain logic for the task-result bridge.
//!
//! Holds the result types, the provider payload normalizer, task-ID
//! extraction, stuck-task helpers and the [`store::ResultStore`] seam with
//! its in-memory implementation. Nothing in here performs network I/O.

pub mod error;
pub mod normalize;
pub mod recovery;
pub mod store;
pub mod task_id;
pub mod task_result;
pub mod types;
