//! Storage seam used by the engines.
//!
//! The graph and hierarchy engines only see [`TaskStore`]. The production
//! implementation, [`SqliteTaskStore`], borrows a single connection (usually
//! an open transaction) so that every read and write an engine performs
//! lands in the same atomic unit.

use rusqlite::Connection;

use crate::errors::{Result, TaskError};
use crate::repository::{DependencyRepository, TaskRepository};
use crate::types::{
    DependencyCreateParams, Task, TaskChanges, TaskCreateParams, TaskDependency, TaskFilter,
};

/// Durable storage of tasks and dependency edges.
#[cfg_attr(test, mockall::automock)]
pub trait TaskStore {
    /// Load a task by id.
    fn get_task(&self, id: &str) -> Result<Option<Task>>;
    /// Owning user of a task.
    fn owner_of(&self, id: &str) -> Result<Option<String>>;
    /// Insert a new task for `owner_id`.
    fn insert_task(&self, owner_id: &str, params: &TaskCreateParams) -> Result<Task>;
    /// Apply a write set; `None` when the task does not exist.
    fn update_task(&self, id: &str, changes: &TaskChanges) -> Result<Option<Task>>;
    /// Remove a task row.
    fn delete_task(&self, id: &str) -> Result<bool>;
    /// Direct children of a task.
    fn children(&self, parent_id: &str) -> Result<Vec<Task>>;
    /// An owner's tasks matching a filter.
    fn list_tasks(&self, owner_id: &str, filter: &TaskFilter) -> Result<Vec<Task>>;
    /// Insert an edge.
    fn insert_dependency(&self, params: &DependencyCreateParams) -> Result<TaskDependency>;
    /// Load an edge by id.
    fn get_dependency(&self, id: &str) -> Result<Option<TaskDependency>>;
    /// Load the edge for an ordered pair.
    fn find_dependency(&self, predecessor_id: &str, successor_id: &str)
    -> Result<Option<TaskDependency>>;
    /// Remove an edge.
    fn delete_dependency(&self, id: &str) -> Result<bool>;
    /// Remove every edge touching a task; returns how many.
    fn delete_dependencies_for(&self, task_id: &str) -> Result<usize>;
    /// Edges where the task is the successor.
    fn incoming(&self, task_id: &str) -> Result<Vec<TaskDependency>>;
    /// Edges where the task is the predecessor.
    fn outgoing(&self, task_id: &str) -> Result<Vec<TaskDependency>>;
    /// Ids of the direct successors of a task.
    fn successor_ids(&self, task_id: &str) -> Result<Vec<String>>;
}

/// Load a task and check it belongs to `owner_id`.
///
/// Foreign tasks are reported exactly like missing ones.
pub fn require_owned_task(store: &dyn TaskStore, owner_id: &str, task_id: &str) -> Result<Task> {
    match store.get_task(task_id)? {
        Some(task) if task.owner_id == owner_id => Ok(task),
        _ => Err(TaskError::task_not_found(task_id)),
    }
}

/// [`TaskStore`] over a borrowed `SQLite` connection.
pub struct SqliteTaskStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTaskStore<'a> {
    /// Wrap a connection or transaction.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl TaskStore for SqliteTaskStore<'_> {
    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        TaskRepository::get_task(self.conn, id)
    }

    fn owner_of(&self, id: &str) -> Result<Option<String>> {
        TaskRepository::owner_of(self.conn, id)
    }

    fn insert_task(&self, owner_id: &str, params: &TaskCreateParams) -> Result<Task> {
        TaskRepository::create_task(self.conn, owner_id, params)
    }

    fn update_task(&self, id: &str, changes: &TaskChanges) -> Result<Option<Task>> {
        TaskRepository::update_task(self.conn, id, changes)
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        TaskRepository::delete_task(self.conn, id)
    }

    fn children(&self, parent_id: &str) -> Result<Vec<Task>> {
        TaskRepository::get_subtasks(self.conn, parent_id)
    }

    fn list_tasks(&self, owner_id: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
        TaskRepository::list_tasks(self.conn, owner_id, filter)
    }

    fn insert_dependency(&self, params: &DependencyCreateParams) -> Result<TaskDependency> {
        DependencyRepository::create_dependency(self.conn, params)
    }

    fn get_dependency(&self, id: &str) -> Result<Option<TaskDependency>> {
        DependencyRepository::get_dependency(self.conn, id)
    }

    fn find_dependency(
        &self,
        predecessor_id: &str,
        successor_id: &str,
    ) -> Result<Option<TaskDependency>> {
        DependencyRepository::find_dependency(self.conn, predecessor_id, successor_id)
    }

    fn delete_dependency(&self, id: &str) -> Result<bool> {
        DependencyRepository::delete_dependency(self.conn, id)
    }

    fn delete_dependencies_for(&self, task_id: &str) -> Result<usize> {
        DependencyRepository::delete_for_task(self.conn, task_id)
    }

    fn incoming(&self, task_id: &str) -> Result<Vec<TaskDependency>> {
        DependencyRepository::get_predecessors(self.conn, task_id)
    }

    fn outgoing(&self, task_id: &str) -> Result<Vec<TaskDependency>> {
        DependencyRepository::get_successors(self.conn, task_id)
    }

    fn successor_ids(&self, task_id: &str) -> Result<Vec<String>> {
        DependencyRepository::successor_ids(self.conn, task_id)
    }
}
