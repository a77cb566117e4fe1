/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque identifier assigned by the generation provider.
pub type TaskId = String;
