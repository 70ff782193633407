//! Core types for the task engine.
//!
//! Records serialize with `camelCase` field names; enum values use
//! `snake_case`. Status, priority and dependency type are closed enums so
//! every decision point matches exhaustively.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Currently being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// Whether this status represents a finished task.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// SQL string representation (matches `SQLite` CHECK constraint values).
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Task priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Default priority.
    Medium,
    /// Elevated priority.
    High,
}

impl TaskPriority {
    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Which lifecycle transition of the successor is constrained by which
/// transition of the predecessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// Successor may start once the predecessor finishes.
    #[default]
    FinishToStart,
    /// Successor may start once the predecessor starts.
    StartToStart,
    /// Successor may finish once the predecessor finishes.
    FinishToFinish,
    /// Successor may finish once the predecessor starts.
    StartToFinish,
}

impl DependencyType {
    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::FinishToStart => "finish_to_start",
            Self::StartToStart => "start_to_start",
            Self::FinishToFinish => "finish_to_finish",
            Self::StartToFinish => "start_to_finish",
        }
    }

    /// Whether an edge of this type requires a completed predecessor
    /// before the successor may leave `Todo`.
    ///
    /// Start-anchored types carry no gate.
    #[must_use]
    pub fn requires_completed_predecessor(self) -> bool {
        match self {
            Self::FinishToStart | Self::FinishToFinish => true,
            Self::StartToStart | Self::StartToFinish => false,
        }
    }
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// A task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique id (`task-<uuid v7>`).
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Short title.
    pub title: String,
    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Percentage of completed children (0-100). Meaningful only for parents.
    pub progress: f64,
    /// Parent task, if this is a sub-task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    /// Opaque category reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Tag names.
    pub tags: Vec<String>,
    /// Due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Reminder time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    /// Set while the task is `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last modification timestamp.
    pub updated_at: String,
}

/// A directed dependency edge (predecessor → successor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependency {
    /// Unique id (`dep-<uuid v7>`).
    pub id: String,
    /// Task that must reach a state first.
    pub predecessor_task_id: String,
    /// Task that is gated.
    pub successor_task_id: String,
    /// Edge semantics.
    pub dependency_type: DependencyType,
    /// Advisory delay in hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag: Option<u32>,
    /// Creation timestamp.
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for creating a task. New tasks always start as `Todo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateParams {
    /// Title (required, non-blank).
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Priority (defaults to `Medium`).
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    /// Due date.
    #[serde(default)]
    pub due_date: Option<String>,
    /// Reminder time.
    #[serde(default)]
    pub reminder_time: Option<String>,
    /// Category reference.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Parent task. Empty string means none.
    #[serde(default)]
    pub parent_task_id: Option<String>,
    /// Tag names.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Partial update for a task. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateParams {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description. Empty string clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// Requested status (subject to dependency gating).
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// New priority.
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    /// New due date. Empty string clears it.
    #[serde(default)]
    pub due_date: Option<String>,
    /// New reminder time. Empty string clears it.
    #[serde(default)]
    pub reminder_time: Option<String>,
    /// New category. Empty string clears it.
    #[serde(default)]
    pub category_id: Option<String>,
    /// New parent. Empty string detaches the task.
    #[serde(default)]
    pub parent_task_id: Option<String>,
    /// Replacement tag list.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Filter for listing an owner's tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    /// Only tasks with this status.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Only tasks with this priority.
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    /// Only tasks in this category.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Only direct children of this task.
    #[serde(default)]
    pub parent_task_id: Option<String>,
    /// Only tasks without a parent.
    #[serde(default)]
    pub root_only: bool,
    /// Substring match on title or description.
    #[serde(default)]
    pub search: Option<String>,
}

/// Parameters for creating a dependency edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyCreateParams {
    /// Task that must reach a state first.
    pub predecessor_task_id: String,
    /// Task that is gated.
    pub successor_task_id: String,
    /// Edge semantics (defaults to `FinishToStart`).
    #[serde(default)]
    pub dependency_type: Option<DependencyType>,
    /// Advisory delay in hours.
    #[serde(default)]
    pub lag: Option<u32>,
}

/// Field-level write set applied to a stored task.
///
/// Built by the engines; the outer `Option` means "leave unchanged" and
/// the inner one on nullable columns means "set NULL".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<Option<String>>,
    /// Status.
    pub status: Option<TaskStatus>,
    /// Priority.
    pub priority: Option<TaskPriority>,
    /// Progress percentage.
    pub progress: Option<f64>,
    /// Parent reference.
    pub parent_task_id: Option<Option<String>>,
    /// Category reference.
    pub category_id: Option<Option<String>>,
    /// Tags.
    pub tags: Option<Vec<String>>,
    /// Due date.
    pub due_date: Option<Option<String>>,
    /// Reminder time.
    pub reminder_time: Option<Option<String>>,
    /// Completion stamp.
    pub completed_at: Option<Option<String>>,
}

impl TaskChanges {
    /// Whether no field would be written.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Views
// ─────────────────────────────────────────────────────────────────────────────

/// A dependency with both endpoint tasks resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDetails {
    /// The edge.
    #[serde(flatten)]
    pub dependency: TaskDependency,
    /// Resolved predecessor.
    pub predecessor_task: Task,
    /// Resolved successor.
    pub successor_task: Task,
}

/// Edges around one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependencies {
    /// Edges where the task is the successor.
    pub predecessors: Vec<DependencyDetails>,
    /// Edges where the task is the predecessor.
    pub successors: Vec<DependencyDetails>,
}

/// A task with its children and dependency edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    /// The task itself.
    #[serde(flatten)]
    pub task: Task,
    /// Direct children.
    pub sub_tasks: Vec<Task>,
    /// Incoming edges.
    pub predecessor_dependencies: Vec<DependencyDetails>,
    /// Outgoing edges.
    pub successor_dependencies: Vec<DependencyDetails>,
}

/// Result of deleting a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    /// Every task removed, the target first.
    pub deleted_task_ids: Vec<String>,
    /// Number of dependency edges removed.
    pub removed_dependency_count: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_values() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            "in_progress"
        );
        let parsed: TaskStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, TaskStatus::Completed);
        assert!(serde_json::from_str::<TaskStatus>("\"cancelled\"").is_err());
    }

    #[test]
    fn dependency_type_wire_values() {
        for (ty, wire) in [
            (DependencyType::FinishToStart, "finish_to_start"),
            (DependencyType::StartToStart, "start_to_start"),
            (DependencyType::FinishToFinish, "finish_to_finish"),
            (DependencyType::StartToFinish, "start_to_finish"),
        ] {
            assert_eq!(serde_json::to_value(ty).unwrap(), wire);
            assert_eq!(ty.as_sql(), wire);
        }
    }

    #[test]
    fn gating_types() {
        assert!(DependencyType::FinishToStart.requires_completed_predecessor());
        assert!(DependencyType::FinishToFinish.requires_completed_predecessor());
        assert!(!DependencyType::StartToStart.requires_completed_predecessor());
        assert!(!DependencyType::StartToFinish.requires_completed_predecessor());
        assert_eq!(DependencyType::default(), DependencyType::FinishToStart);
    }

    #[test]
    fn create_params_from_camel_case() {
        let params: TaskCreateParams = serde_json::from_str(
            r#"{"title": "Write report", "parentTaskId": "task-1", "tags": ["work"]}"#,
        )
        .unwrap();
        assert_eq!(params.title, "Write report");
        assert_eq!(params.parent_task_id.as_deref(), Some("task-1"));
        assert_eq!(params.tags, Some(vec!["work".to_string()]));
        assert!(params.priority.is_none());
    }

    #[test]
    fn dependency_params_reject_negative_lag() {
        let result = serde_json::from_str::<DependencyCreateParams>(
            r#"{"predecessorTaskId": "a", "successorTaskId": "b", "lag": -2}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn task_changes_empty() {
        assert!(TaskChanges::default().is_empty());
        let changes = TaskChanges {
            progress: Some(50.0),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn task_view_flattens_task() {
        let task = Task {
            id: "task-1".into(),
            owner_id: "user-1".into(),
            title: "Parent".into(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            progress: 0.0,
            parent_task_id: None,
            category_id: None,
            tags: vec![],
            due_date: None,
            reminder_time: None,
            completed_at: None,
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        };
        let view = TaskView {
            task,
            sub_tasks: vec![],
            predecessor_dependencies: vec![],
            successor_dependencies: vec![],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "task-1");
        assert_eq!(json["ownerId"], "user-1");
        assert!(json["subTasks"].as_array().unwrap().is_empty());
        assert!(json.get("description").is_none());
        assert!(json.get("predecessorDependencies").is_some());
    }
}
