//! SQL data access for tasks and dependency edges.
//!
//! All methods take a `&Connection` and are stateless: they translate
//! between Rust types and SQL and enforce nothing beyond what the schema
//! enforces. Validation lives in the engines.

use rusqlite::{Connection, OptionalExtension, params};
use taskflow_core::ids::{DEPENDENCY_PREFIX, TASK_PREFIX, generate_id, now_iso};
use tracing::debug;

use crate::errors::{Result, TaskError};
use crate::types::{
    DependencyCreateParams, DependencyType, Task, TaskChanges, TaskCreateParams, TaskDependency,
    TaskFilter, TaskPriority, TaskStatus,
};

/// Parse a JSON array string into a `Vec<String>`.
fn parse_tags(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Serialize tags to a JSON array string.
fn tags_to_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Treat empty strings as absent for optional references.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Task repository for SQL CRUD operations.
pub struct TaskRepository;

impl TaskRepository {
    /// Insert a new `Todo` task owned by `owner_id`.
    pub fn create_task(conn: &Connection, owner_id: &str, params: &TaskCreateParams) -> Result<Task> {
        let id = generate_id(TASK_PREFIX);
        let now = now_iso();
        let priority = params.priority.unwrap_or(TaskPriority::Medium);
        let tags_json = tags_to_json(params.tags.as_deref().unwrap_or(&[]));

        let _ = conn.execute(
            "INSERT INTO tasks (id, owner_id, parent_task_id, category_id, title, description,
             status, priority, progress, tags, due_date, reminder_time, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?11, ?12, ?12)",
            params![
                id,
                owner_id,
                non_empty(params.parent_task_id.as_deref()),
                non_empty(params.category_id.as_deref()),
                params.title.trim(),
                params.description,
                TaskStatus::Todo.as_sql(),
                priority.as_sql(),
                tags_json,
                params.due_date,
                params.reminder_time,
                now,
            ],
        )?;
        debug!(task_id = %id, owner_id, "task inserted");

        Self::get_task(conn, &id)?.ok_or_else(|| TaskError::task_not_found(&id))
    }

    /// Get a task by id.
    pub fn get_task(conn: &Connection, id: &str) -> Result<Option<Task>> {
        let task = conn
            .query_row("SELECT * FROM tasks WHERE id = ?1", params![id], |row| {
                Ok(task_from_row(row))
            })
            .optional()?;
        Ok(task)
    }

    /// Owner of a task, if it exists.
    pub fn owner_of(conn: &Connection, id: &str) -> Result<Option<String>> {
        let owner = conn
            .query_row(
                "SELECT owner_id FROM tasks WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    /// Apply a write set. Returns the updated task, or `None` if not found.
    pub fn update_task(conn: &Connection, id: &str, changes: &TaskChanges) -> Result<Option<Task>> {
        if changes.is_empty() {
            return Self::get_task(conn, id);
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref title) = changes.title {
            sets.push("title = ?");
            values.push(Box::new(title.trim().to_string()));
        }
        if let Some(ref desc) = changes.description {
            sets.push("description = ?");
            values.push(Box::new(desc.clone()));
        }
        if let Some(status) = changes.status {
            sets.push("status = ?");
            values.push(Box::new(status.as_sql()));
        }
        if let Some(priority) = changes.priority {
            sets.push("priority = ?");
            values.push(Box::new(priority.as_sql()));
        }
        if let Some(progress) = changes.progress {
            sets.push("progress = ?");
            values.push(Box::new(progress));
        }
        if let Some(ref parent) = changes.parent_task_id {
            sets.push("parent_task_id = ?");
            values.push(Box::new(parent.clone()));
        }
        if let Some(ref category) = changes.category_id {
            sets.push("category_id = ?");
            values.push(Box::new(category.clone()));
        }
        if let Some(ref tags) = changes.tags {
            sets.push("tags = ?");
            values.push(Box::new(tags_to_json(tags)));
        }
        if let Some(ref due) = changes.due_date {
            sets.push("due_date = ?");
            values.push(Box::new(due.clone()));
        }
        if let Some(ref reminder) = changes.reminder_time {
            sets.push("reminder_time = ?");
            values.push(Box::new(reminder.clone()));
        }
        if let Some(ref completed_at) = changes.completed_at {
            sets.push("completed_at = ?");
            values.push(Box::new(completed_at.clone()));
        }

        sets.push("updated_at = ?");
        values.push(Box::new(now_iso()));
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(AsRef::as_ref).collect();
        let changed = conn.execute(&sql, params_refs.as_slice())?;

        if changed == 0 {
            return Ok(None);
        }
        debug!(task_id = id, fields = sets.len() - 1, "task updated");

        Self::get_task(conn, id)
    }

    /// Delete a task row. Returns true if a row was deleted.
    pub fn delete_task(conn: &Connection, id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Direct children of a task, oldest first.
    pub fn get_subtasks(conn: &Connection, parent_task_id: &str) -> Result<Vec<Task>> {
        let mut stmt = conn.prepare_cached(
            "SELECT * FROM tasks WHERE parent_task_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let tasks = stmt
            .query_map(params![parent_task_id], |row| Ok(task_from_row(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// An owner's tasks matching `filter`, newest first.
    pub fn list_tasks(conn: &Connection, owner_id: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut conditions: Vec<&'static str> = vec!["owner_id = ?"];
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(owner_id.to_string())];

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            values.push(Box::new(status.as_sql()));
        }
        if let Some(priority) = filter.priority {
            conditions.push("priority = ?");
            values.push(Box::new(priority.as_sql()));
        }
        if let Some(category) = non_empty(filter.category_id.as_deref()) {
            conditions.push("category_id = ?");
            values.push(Box::new(category.to_string()));
        }
        if let Some(parent) = non_empty(filter.parent_task_id.as_deref()) {
            conditions.push("parent_task_id = ?");
            values.push(Box::new(parent.to_string()));
        } else if filter.root_only {
            conditions.push("parent_task_id IS NULL");
        }
        if let Some(search) = non_empty(filter.search.as_deref()) {
            let pattern = format!("%{search}%");
            conditions.push("(title LIKE ? OR COALESCE(description, '') LIKE ?)");
            values.push(Box::new(pattern.clone()));
            values.push(Box::new(pattern));
        }

        let sql = format!(
            "SELECT * FROM tasks WHERE {} ORDER BY created_at DESC, id DESC",
            conditions.join(" AND ")
        );
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params_refs.as_slice(), |row| Ok(task_from_row(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }
}

/// Dependency edge repository.
pub struct DependencyRepository;

impl DependencyRepository {
    /// Insert an edge. Uniqueness and self-edge checks are the caller's job;
    /// the schema rejects violations with a constraint error.
    pub fn create_dependency(conn: &Connection, params: &DependencyCreateParams) -> Result<TaskDependency> {
        let id = generate_id(DEPENDENCY_PREFIX);
        let dependency_type = params.dependency_type.unwrap_or_default();

        let _ = conn.execute(
            "INSERT INTO task_dependencies
             (id, predecessor_task_id, successor_task_id, dependency_type, lag, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                params.predecessor_task_id,
                params.successor_task_id,
                dependency_type.as_sql(),
                params.lag,
                now_iso(),
            ],
        )?;
        debug!(
            dependency_id = %id,
            predecessor = %params.predecessor_task_id,
            successor = %params.successor_task_id,
            "dependency inserted"
        );

        Self::get_dependency(conn, &id)?.ok_or_else(|| TaskError::dependency_not_found(&id))
    }

    /// Get an edge by id.
    pub fn get_dependency(conn: &Connection, id: &str) -> Result<Option<TaskDependency>> {
        let dep = conn
            .query_row(
                "SELECT * FROM task_dependencies WHERE id = ?1",
                params![id],
                |row| Ok(dependency_from_row(row)),
            )
            .optional()?;
        Ok(dep)
    }

    /// Get the edge for an ordered pair, if any.
    pub fn find_dependency(
        conn: &Connection,
        predecessor_task_id: &str,
        successor_task_id: &str,
    ) -> Result<Option<TaskDependency>> {
        let dep = conn
            .query_row(
                "SELECT * FROM task_dependencies
                 WHERE predecessor_task_id = ?1 AND successor_task_id = ?2",
                params![predecessor_task_id, successor_task_id],
                |row| Ok(dependency_from_row(row)),
            )
            .optional()?;
        Ok(dep)
    }

    /// Delete an edge by id. Returns true if a row was deleted.
    pub fn delete_dependency(conn: &Connection, id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM task_dependencies WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Delete every edge touching a task. Returns the number removed.
    pub fn delete_for_task(conn: &Connection, task_id: &str) -> Result<usize> {
        let removed = conn.execute(
            "DELETE FROM task_dependencies
             WHERE predecessor_task_id = ?1 OR successor_task_id = ?1",
            params![task_id],
        )?;
        Ok(removed)
    }

    /// Edges where `task_id` is the successor.
    pub fn get_predecessors(conn: &Connection, task_id: &str) -> Result<Vec<TaskDependency>> {
        Self::query_edges(
            conn,
            "SELECT * FROM task_dependencies WHERE successor_task_id = ?1
             ORDER BY created_at ASC, id ASC",
            task_id,
        )
    }

    /// Edges where `task_id` is the predecessor.
    pub fn get_successors(conn: &Connection, task_id: &str) -> Result<Vec<TaskDependency>> {
        Self::query_edges(
            conn,
            "SELECT * FROM task_dependencies WHERE predecessor_task_id = ?1
             ORDER BY created_at ASC, id ASC",
            task_id,
        )
    }

    /// Adjacency list entry: ids of the direct successors of `task_id`.
    pub fn successor_ids(conn: &Connection, task_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare_cached(
            "SELECT successor_task_id FROM task_dependencies WHERE predecessor_task_id = ?1",
        )?;
        let ids = stmt
            .query_map(params![task_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn query_edges(conn: &Connection, sql: &str, task_id: &str) -> Result<Vec<TaskDependency>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let deps = stmt
            .query_map(params![task_id], |row| Ok(dependency_from_row(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deps)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row conversion
// ─────────────────────────────────────────────────────────────────────────────

fn task_from_row(row: &rusqlite::Row<'_>) -> Task {
    let status_str: String = row.get_unwrap("status");
    let priority_str: String = row.get_unwrap("priority");
    let tags_json: String = row.get_unwrap("tags");

    Task {
        id: row.get_unwrap("id"),
        owner_id: row.get_unwrap("owner_id"),
        title: row.get_unwrap("title"),
        description: row.get_unwrap("description"),
        status: match status_str.as_str() {
            "in_progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Todo,
        },
        priority: match priority_str.as_str() {
            "low" => TaskPriority::Low,
            "high" => TaskPriority::High,
            _ => TaskPriority::Medium,
        },
        progress: row.get_unwrap("progress"),
        parent_task_id: row.get_unwrap("parent_task_id"),
        category_id: row.get_unwrap("category_id"),
        tags: parse_tags(&tags_json),
        due_date: row.get_unwrap("due_date"),
        reminder_time: row.get_unwrap("reminder_time"),
        completed_at: row.get_unwrap("completed_at"),
        created_at: row.get_unwrap("created_at"),
        updated_at: row.get_unwrap("updated_at"),
    }
}

fn dependency_from_row(row: &rusqlite::Row<'_>) -> TaskDependency {
    let type_str: String = row.get_unwrap("dependency_type");

    TaskDependency {
        id: row.get_unwrap("id"),
        predecessor_task_id: row.get_unwrap("predecessor_task_id"),
        successor_task_id: row.get_unwrap("successor_task_id"),
        dependency_type: match type_str.as_str() {
            "start_to_start" => DependencyType::StartToStart,
            "finish_to_finish" => DependencyType::FinishToFinish,
            "start_to_finish" => DependencyType::StartToFinish,
            _ => DependencyType::FinishToStart,
        },
        lag: row.get_unwrap("lag"),
        created_at: row.get_unwrap("created_at"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
