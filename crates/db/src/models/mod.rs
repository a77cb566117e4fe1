pub mod task_result;
