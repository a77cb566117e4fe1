mod task_result_repo;

pub use task_result_repo::TaskResultRepo;
