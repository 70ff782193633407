//! Settings types.
//!
//! All structs deserialize with `camelCase` keys and fall back to their
//! [`Default`] for any missing field, so a partial settings file is valid.

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskflowSettings {
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// `SQLite` store settings.
    pub database: DatabaseSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
    /// Dependency/hierarchy engine policies.
    pub engine: EngineSettings,
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (0 picks an ephemeral port).
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8420,
        }
    }
}

/// `SQLite` store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file path. Relative paths resolve against `~/.taskflow`.
    pub path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// `PRAGMA busy_timeout` in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "taskflow.db".to_string(),
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// How far a child change propagates up the hierarchy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupMode {
    /// Recompute only the direct parent. Grandparents go stale until
    /// one of their own children changes.
    #[default]
    SingleLevel,
    /// Recompute the direct parent, then every ancestor up to the root.
    Recursive,
}

/// What happens to a deleted task's children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Delete the whole subtree along with every edge touching it.
    #[default]
    Cascade,
    /// Detach the children; they become roots and keep their state.
    Orphan,
}

/// Dependency/hierarchy engine policies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Roll-up propagation mode.
    pub rollup_mode: RollupMode,
    /// Child handling on task deletion.
    pub delete_policy: DeletePolicy,
}
