//! Metric names recorded by the engine.
//!
//! Recording is a no-op until the host process installs a recorder.

/// Accepted task mutations (counter, labels: `op`).
pub const TASK_MUTATIONS_TOTAL: &str = "taskflow_task_mutations_total";
/// Rejected dependency-graph requests (counter, labels: `reason`).
pub const DEPENDENCY_REJECTIONS_TOTAL: &str = "taskflow_dependency_rejections_total";
/// Parent aggregate recomputations that found children (counter).
pub const ROLLUPS_TOTAL: &str = "taskflow_rollups_total";
/// `SQLITE_BUSY` retries inside write transactions (counter).
pub const BUSY_RETRIES_TOTAL: &str = "taskflow_busy_retries_total";
