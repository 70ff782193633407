//! Error types for the task engine.
//!
//! [`TaskError`] splits into two groups. Caller errors (`NotFound`,
//! `InvalidArgument`, `Conflict`) carry the specific reason and are never
//! retried. Infrastructure errors (`Sqlite`, `Pool`, `Migration`,
//! `Internal`) come from the store and may be retried by the caller.

use thiserror::Error;

/// Errors returned by task engine operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A task, dependency, or parent does not exist or belongs to another owner.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (`task`, `dependency`, `parent task`).
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The request is structurally invalid (self-dependency, cycle,
    /// blocked transition, bad field value).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request collides with existing state (duplicate edge).
    #[error("conflict: {0}")]
    Conflict(String),

    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Internal error (e.g. poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

impl TaskError {
    /// Task lookup failed.
    pub fn task_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "task",
            id: id.to_string(),
        }
    }

    /// Dependency lookup failed.
    pub fn dependency_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "dependency",
            id: id.to_string(),
        }
    }

    /// Parent lookup failed.
    pub fn parent_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "parent task",
            id: id.to_string(),
        }
    }

    /// Whether the error originates in the store rather than the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(_) | Self::Pool(_) | Self::Migration { .. } | Self::Internal(_)
        )
    }

    /// Whether the error is `SQLITE_BUSY`/`SQLITE_LOCKED` contention.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(code, _)) => matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Convenience type alias for task engine results.
pub type Result<T> = std::result::Result<T, TaskError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn busy() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        )
    }

    #[test]
    fn not_found_display() {
        assert_eq!(
            TaskError::task_not_found("task-1").to_string(),
            "task not found: task-1"
        );
        assert_eq!(
            TaskError::dependency_not_found("dep-1").to_string(),
            "dependency not found: dep-1"
        );
        assert_eq!(
            TaskError::parent_not_found("task-2").to_string(),
            "parent task not found: task-2"
        );
    }

    #[test]
    fn caller_error_display() {
        assert_eq!(
            TaskError::InvalidArgument("self-dependency".into()).to_string(),
            "invalid argument: self-dependency"
        );
        assert_eq!(
            TaskError::Conflict("duplicate dependency".into()).to_string(),
            "conflict: duplicate dependency"
        );
    }

    #[test]
    fn classification() {
        assert!(!TaskError::task_not_found("x").is_infrastructure());
        assert!(!TaskError::InvalidArgument("x".into()).is_infrastructure());
        assert!(!TaskError::Conflict("x".into()).is_infrastructure());
        assert!(TaskError::Internal("x".into()).is_infrastructure());
        assert!(TaskError::from(rusqlite::Error::QueryReturnedNoRows).is_infrastructure());
    }

    #[test]
    fn busy_detection() {
        assert!(TaskError::from(busy()).is_busy());
        assert!(!TaskError::from(rusqlite::Error::QueryReturnedNoRows).is_busy());
        assert!(!TaskError::Conflict("x".into()).is_busy());
    }
}
