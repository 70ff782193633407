//! Identifier and timestamp helpers.
//!
//! Ids are `<prefix>-<uuid v7>` so they sort by creation time within a
//! prefix. Timestamps are second-precision UTC ISO 8601 strings, which
//! also sort lexically.

use uuid::Uuid;

/// Prefix for task ids.
pub const TASK_PREFIX: &str = "task";

/// Prefix for dependency edge ids.
pub const DEPENDENCY_PREFIX: &str = "dep";

/// Generate a prefixed UUID v7 id.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}

/// Current UTC time as an ISO 8601 string.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
