//! Task lifecycle coordination.
//!
//! [`TaskLifecycleCoordinator`] is the entry point for the API layer. Every
//! mutating operation runs under a per-owner write lock and inside a single
//! `BEGIN IMMEDIATE` transaction that covers the ownership check, the graph
//! or hierarchy mutation, and any roll-up it triggers. Either all of it
//! commits or none of it does.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use metrics::counter;
use rusqlite::{Transaction, TransactionBehavior};
use taskflow_core::ids::now_iso;
use taskflow_settings::{DeletePolicy, EngineSettings};
use tracing::{info, instrument, warn};

use crate::connection::{ConnectionPool, PooledConnection};
use crate::errors::{Result, TaskError};
use crate::graph::DependencyGraphEngine;
use crate::hierarchy::HierarchyEngine;
use crate::metrics::{BUSY_RETRIES_TOTAL, DEPENDENCY_REJECTIONS_TOTAL, TASK_MUTATIONS_TOTAL};
use crate::store::{SqliteTaskStore, TaskStore, require_owned_task};
use crate::types::{
    DeleteOutcome, DependencyCreateParams, DependencyDetails, Task, TaskChanges, TaskCreateParams,
    TaskDependencies, TaskDependency, TaskFilter, TaskStatus, TaskUpdateParams, TaskView,
};

/// Orchestrates task create/update/delete around the two engines.
pub struct TaskLifecycleCoordinator {
    pool: ConnectionPool,
    engine: EngineSettings,
    owner_write_locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl TaskLifecycleCoordinator {
    const SQLITE_BUSY_MAX_RETRIES: u32 = 32;

    /// Create a coordinator over a migrated pool.
    pub fn new(pool: ConnectionPool, engine: EngineSettings) -> Self {
        Self {
            pool,
            engine,
            owner_write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Active engine policies.
    pub fn engine_settings(&self) -> EngineSettings {
        self.engine
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────

    /// Create a task and roll its parent up.
    #[instrument(skip(self, params), fields(parent_task_id = params.parent_task_id.as_deref()))]
    pub fn create_task(&self, owner_id: &str, params: &TaskCreateParams) -> Result<TaskView> {
        if params.title.trim().is_empty() {
            return Err(TaskError::InvalidArgument("title is required".into()));
        }
        let parent_id = params.parent_task_id.as_deref().filter(|s| !s.is_empty());

        let view = self.write(owner_id, |store| {
            if let Some(parent_id) = parent_id {
                let _ = HierarchyEngine::validate_parent(store, owner_id, None, parent_id)?;
            }
            let task = store.insert_task(owner_id, params)?;
            if let Some(parent_id) = parent_id {
                let _ = HierarchyEngine::roll_up(store, parent_id, self.engine.rollup_mode)?;
            }
            Self::build_view(store, &task.id)
        })?;

        counter!(TASK_MUTATIONS_TOTAL, "op" => "create").increment(1);
        info!(task_id = %view.task.id, "task created");
        Ok(view)
    }

    /// Apply a patch, gating status changes on dependencies and re-running
    /// roll-up for every parent the change affects.
    #[instrument(skip(self, patch))]
    pub fn update_task(
        &self,
        owner_id: &str,
        task_id: &str,
        patch: &TaskUpdateParams,
    ) -> Result<TaskView> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TaskError::InvalidArgument("title must not be empty".into()));
        }

        let view = self.write(owner_id, |store| {
            let current = require_owned_task(store, owner_id, task_id)?;
            let mut changes = Self::field_changes(patch);

            let status_change = patch.status.filter(|next| *next != current.status);
            if let Some(next) = status_change {
                Self::ensure_transition_allowed(store, task_id, next)?;
                changes.status = Some(next);
                changes.completed_at = match next {
                    TaskStatus::Completed => Some(Some(now_iso())),
                    TaskStatus::Todo | TaskStatus::InProgress => {
                        current.status.is_terminal().then_some(None)
                    }
                };
            }

            let old_parent = current.parent_task_id.clone();
            let parent_change = patch
                .parent_task_id
                .as_ref()
                .map(|p| Some(p.clone()).filter(|p| !p.is_empty()))
                .filter(|new_parent| *new_parent != old_parent);

            let updated = store
                .update_task(task_id, &changes)?
                .ok_or_else(|| TaskError::task_not_found(task_id))?;

            let mode = self.engine.rollup_mode;
            match &parent_change {
                Some(new_parent) => {
                    match new_parent {
                        Some(parent_id) => {
                            let _ = HierarchyEngine::attach_child(store, owner_id, task_id, parent_id)?;
                        }
                        None => {
                            let _ = HierarchyEngine::detach_child(store, owner_id, task_id)?;
                        }
                    }
                    for parent_id in old_parent.iter().chain(new_parent.iter()) {
                        let _ = HierarchyEngine::roll_up(store, parent_id, mode)?;
                    }
                }
                None => {
                    if let (Some(_), Some(parent_id)) = (status_change, &updated.parent_task_id) {
                        let _ = HierarchyEngine::roll_up(store, parent_id, mode)?;
                    }
                }
            }

            Self::build_view(store, task_id)
        })?;

        counter!(TASK_MUTATIONS_TOTAL, "op" => "update").increment(1);
        info!(status = %view.task.status, "task updated");
        Ok(view)
    }

    /// Delete a task, its edges, and (per policy) its subtree, then roll
    /// its former parent up.
    #[instrument(skip(self))]
    pub fn delete_task(&self, owner_id: &str, task_id: &str) -> Result<DeleteOutcome> {
        let outcome = self.write(owner_id, |store| {
            let task = require_owned_task(store, owner_id, task_id)?;
            let mut doomed = vec![task.id.clone()];

            match self.engine.delete_policy {
                DeletePolicy::Cascade => {
                    doomed.extend(
                        HierarchyEngine::descendants(store, task_id)?
                            .into_iter()
                            .map(|t| t.id),
                    );
                }
                DeletePolicy::Orphan => {
                    for child in store.children(task_id)? {
                        let _ = HierarchyEngine::detach_child(store, owner_id, &child.id)?;
                    }
                }
            }

            // leaves first, so no surviving row references a deleted parent
            let mut removed_dependency_count = 0;
            for id in doomed.iter().rev() {
                removed_dependency_count += store.delete_dependencies_for(id)?;
                let _ = store.delete_task(id)?;
            }

            if let Some(parent_id) = &task.parent_task_id {
                let _ = HierarchyEngine::roll_up(store, parent_id, self.engine.rollup_mode)?;
            }

            Ok(DeleteOutcome {
                deleted_task_ids: doomed,
                removed_dependency_count,
            })
        })?;

        counter!(TASK_MUTATIONS_TOTAL, "op" => "delete").increment(1);
        info!(
            deleted = outcome.deleted_task_ids.len(),
            edges = outcome.removed_dependency_count,
            "task deleted"
        );
        Ok(outcome)
    }

    /// Re-run roll-up for a parent. Safe to retry.
    #[instrument(skip(self))]
    pub fn recompute_aggregate(&self, owner_id: &str, task_id: &str) -> Result<TaskView> {
        self.write(owner_id, |store| {
            let _ = require_owned_task(store, owner_id, task_id)?;
            let _ = HierarchyEngine::roll_up(store, task_id, self.engine.rollup_mode)?;
            Self::build_view(store, task_id)
        })
    }

    /// A task with its children and edges.
    pub fn get_task(&self, owner_id: &str, task_id: &str) -> Result<TaskView> {
        self.read(|store| {
            let _ = require_owned_task(store, owner_id, task_id)?;
            Self::build_view(store, task_id)
        })
    }

    /// An owner's tasks matching `filter`.
    pub fn list_tasks(&self, owner_id: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.read(|store| store.list_tasks(owner_id, filter))
    }

    /// Direct children of a task.
    pub fn list_subtasks(&self, owner_id: &str, parent_task_id: &str) -> Result<Vec<Task>> {
        self.read(|store| {
            let _ = require_owned_task(store, owner_id, parent_task_id)?;
            store.children(parent_task_id)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dependencies
    // ─────────────────────────────────────────────────────────────────────

    /// Add a dependency edge.
    #[instrument(skip(self, params), fields(
        predecessor = %params.predecessor_task_id,
        successor = %params.successor_task_id
    ))]
    pub fn create_dependency(
        &self,
        owner_id: &str,
        params: &DependencyCreateParams,
    ) -> Result<DependencyDetails> {
        let details = self
            .write(owner_id, |store| {
                DependencyGraphEngine::create_dependency(store, owner_id, params)
            })
            .inspect_err(|err| {
                if !err.is_infrastructure() {
                    warn!(error = %err, "dependency rejected");
                }
            })?;

        counter!(TASK_MUTATIONS_TOTAL, "op" => "create_dependency").increment(1);
        info!(dependency_id = %details.dependency.id, "dependency created");
        Ok(details)
    }

    /// Edges around a task.
    pub fn list_dependencies(&self, owner_id: &str, task_id: &str) -> Result<TaskDependencies> {
        self.read(|store| DependencyGraphEngine::list_dependencies(store, owner_id, task_id))
    }

    /// Remove a dependency edge.
    #[instrument(skip(self))]
    pub fn delete_dependency(&self, owner_id: &str, dependency_id: &str) -> Result<TaskDependency> {
        let removed = self.write(owner_id, |store| {
            DependencyGraphEngine::delete_dependency(store, owner_id, dependency_id)
        })?;
        counter!(TASK_MUTATIONS_TOTAL, "op" => "delete_dependency").increment(1);
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────

    fn field_changes(patch: &TaskUpdateParams) -> TaskChanges {
        TaskChanges {
            title: patch.title.clone(),
            description: clearable(patch.description.as_deref()),
            priority: patch.priority,
            category_id: clearable(patch.category_id.as_deref()),
            tags: patch.tags.clone(),
            due_date: clearable(patch.due_date.as_deref()),
            reminder_time: clearable(patch.reminder_time.as_deref()),
            ..TaskChanges::default()
        }
    }

    fn ensure_transition_allowed(
        store: &dyn TaskStore,
        task_id: &str,
        next: TaskStatus,
    ) -> Result<()> {
        let blocking = DependencyGraphEngine::blocking_predecessors(store, task_id, next)?;
        if blocking.is_empty() {
            return Ok(());
        }
        let predecessors: Vec<&str> = blocking
            .iter()
            .map(|edge| edge.predecessor_task_id.as_str())
            .collect();
        warn!(task_id, status = %next, ?predecessors, "status change blocked");
        counter!(DEPENDENCY_REJECTIONS_TOTAL, "reason" => "blocked").increment(1);
        Err(TaskError::InvalidArgument(format!(
            "blocked by dependency: {} not completed",
            predecessors.join(", ")
        )))
    }

    fn build_view(store: &dyn TaskStore, task_id: &str) -> Result<TaskView> {
        let task = store
            .get_task(task_id)?
            .ok_or_else(|| TaskError::task_not_found(task_id))?;
        let sub_tasks = store.children(task_id)?;
        let deps = DependencyGraphEngine::list_dependencies(store, &task.owner_id, task_id)?;
        Ok(TaskView {
            task,
            sub_tasks,
            predecessor_dependencies: deps.predecessors,
            successor_dependencies: deps.successors,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transactions and locking
    // ─────────────────────────────────────────────────────────────────────

    /// Run `f` in an immediate transaction while holding the owner's lock.
    fn write<T>(&self, owner_id: &str, mut f: impl FnMut(&dyn TaskStore) -> Result<T>) -> Result<T> {
        self.with_owner_write_lock(owner_id, || {
            let conn = self.conn()?;
            let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
            let value = f(&SqliteTaskStore::new(&tx))?;
            tx.commit()?;
            Ok(value)
        })
    }

    /// Run `f` inside a deferred transaction for a consistent snapshot.
    fn read<T>(&self, mut f: impl FnMut(&dyn TaskStore) -> Result<T>) -> Result<T> {
        self.retry_on_sqlite_busy(|| {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;
            let value = f(&SqliteTaskStore::new(&tx))?;
            tx.commit()?;
            Ok(value)
        })
    }

    fn acquire_owner_write_lock(&self, owner_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .owner_write_locks
            .lock()
            .map_err(|_| TaskError::Internal("owner lock map poisoned".into()))?;

        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(owner_id).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        let lock = Arc::new(Mutex::new(()));
        let _ = locks.insert(owner_id.to_string(), Arc::downgrade(&lock));
        Ok(lock)
    }

    fn with_owner_write_lock<T>(&self, owner_id: &str, f: impl FnMut() -> Result<T>) -> Result<T> {
        let owner_lock = self.acquire_owner_write_lock(owner_id)?;
        let _guard = owner_lock
            .lock()
            .map_err(|_| TaskError::Internal("owner write lock poisoned".into()))?;
        self.retry_on_sqlite_busy(f)
    }

    /// Retry on `SQLITE_BUSY`/`SQLITE_LOCKED` with linear backoff and jitter.
    ///
    /// Backoff: base = min(attempts * 10, 500) ms, jitter ±25%.
    #[allow(clippy::unused_self)]
    fn retry_on_sqlite_busy<T>(&self, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;

        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_busy() && attempts < Self::SQLITE_BUSY_MAX_RETRIES => {
                    attempts += 1;
                    counter!(BUSY_RETRIES_TOTAL).increment(1);
                    let base_ms = u64::from(attempts).saturating_mul(10).min(500);
                    let jitter_range = base_ms / 4;
                    let jitter = if jitter_range > 0 {
                        rand::random::<u64>() % (jitter_range * 2 + 1)
                    } else {
                        0
                    };
                    std::thread::sleep(Duration::from_millis(
                        base_ms.saturating_sub(jitter_range) + jitter,
                    ));
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }
}

/// Patch value for a nullable column: absent leaves it, empty string sets NULL.
fn clearable(value: Option<&str>) -> Option<Option<String>> {
    value.map(|v| Some(v.to_string()).filter(|v| !v.is_empty()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use assert_matches::assert_matches;
    use taskflow_settings::RollupMode;

    use super::*;
    use crate::connection::{ConnectionConfig, new_file, new_in_memory};
    use crate::migrations::run_migrations;
    use crate::types::DependencyType;

    const OWNER: &str = "user-1";

    fn coordinator_with(engine: EngineSettings) -> TaskLifecycleCoordinator {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            run_migrations(&conn).unwrap();
        }
        TaskLifecycleCoordinator::new(pool, engine)
    }

    fn coordinator() -> TaskLifecycleCoordinator {
        coordinator_with(EngineSettings::default())
    }

    fn create(c: &TaskLifecycleCoordinator, title: &str, parent: Option<&str>) -> Task {
        c.create_task(
            OWNER,
            &TaskCreateParams {
                title: title.into(),
                parent_task_id: parent.map(str::to_string),
                ..Default::default()
            },
        )
        .unwrap()
        .task
    }

    fn set_status(c: &TaskLifecycleCoordinator, id: &str, status: TaskStatus) -> Result<TaskView> {
        c.update_task(
            OWNER,
            id,
            &TaskUpdateParams {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    fn depend(c: &TaskLifecycleCoordinator, from: &str, to: &str) -> Result<DependencyDetails> {
        c.create_dependency(
            OWNER,
            &DependencyCreateParams {
                predecessor_task_id: from.into(),
                successor_task_id: to.into(),
                ..Default::default()
            },
        )
    }

    // --- create ---

    #[test]
    fn create_task_starts_todo() {
        let c = coordinator();
        let view = c
            .create_task(
                OWNER,
                &TaskCreateParams {
                    title: "Write".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(view.task.status, TaskStatus::Todo);
        assert!(view.task.progress.abs() < f64::EPSILON);
        assert!(view.sub_tasks.is_empty());
    }

    #[test]
    fn create_task_requires_title() {
        let c = coordinator();
        let result = c.create_task(
            OWNER,
            &TaskCreateParams {
                title: "   ".into(),
                ..Default::default()
            },
        );
        assert_matches!(result, Err(TaskError::InvalidArgument(_)));
    }

    #[test]
    fn create_child_rolls_parent_up() {
        let c = coordinator();
        let parent = create(&c, "Parent", None);
        let child = create(&c, "Child", Some(&parent.id));
        set_status(&c, &child.id, TaskStatus::Completed).unwrap();

        // a second, unfinished child drags the parent back to in-progress
        create(&c, "Child 2", Some(&parent.id));
        let view = c.get_task(OWNER, &parent.id).unwrap();
        assert_eq!(view.task.status, TaskStatus::InProgress);
        assert!((view.task.progress - 50.0).abs() < f64::EPSILON);
        assert_eq!(view.sub_tasks.len(), 2);
    }

    #[test]
    fn create_under_foreign_parent_is_not_found() {
        let c = coordinator();
        let theirs = c
            .create_task(
                "user-2",
                &TaskCreateParams {
                    title: "Theirs".into(),
                    ..Default::default()
                },
            )
            .unwrap()
            .task;
        let result = c.create_task(
            OWNER,
            &TaskCreateParams {
                title: "Sneaky".into(),
                parent_task_id: Some(theirs.id),
                ..Default::default()
            },
        );
        assert_matches!(result, Err(TaskError::NotFound { .. }));
        assert!(c.list_tasks(OWNER, &TaskFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn empty_strings_clear_nullable_fields() {
        let c = coordinator();
        let task = c
            .create_task(
                OWNER,
                &TaskCreateParams {
                    title: "Dated".into(),
                    description: Some("notes".into()),
                    due_date: Some("2026-11-01T00:00:00Z".into()),
                    reminder_time: Some("2026-10-31T09:00:00Z".into()),
                    category_id: Some("cat-1".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .task;
        assert_eq!(task.description.as_deref(), Some("notes"));

        let view = c
            .update_task(
                OWNER,
                &task.id,
                &TaskUpdateParams {
                    description: Some(String::new()),
                    due_date: Some(String::new()),
                    reminder_time: Some(String::new()),
                    category_id: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(view.task.description.is_none());
        assert!(view.task.due_date.is_none());
        assert!(view.task.reminder_time.is_none());
        assert!(view.task.category_id.is_none());
        assert_eq!(view.task.title, "Dated");
    }

    #[test]
    fn absent_fields_are_left_alone() {
        let c = coordinator();
        let task = c
            .create_task(
                OWNER,
                &TaskCreateParams {
                    title: "Keep".into(),
                    description: Some("notes".into()),
                    due_date: Some("2026-11-01T00:00:00Z".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .task;
        let view = c
            .update_task(
                OWNER,
                &task.id,
                &TaskUpdateParams {
                    title: Some("Kept".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(view.task.description.as_deref(), Some("notes"));
        assert_eq!(view.task.due_date.as_deref(), Some("2026-11-01T00:00:00Z"));
    }

    // --- status gating ---

    #[test]
    fn finish_to_start_blocks_until_predecessor_completed() {
        let c = coordinator();
        let a = create(&c, "A", None);
        let b = create(&c, "B", None);
        depend(&c, &a.id, &b.id).unwrap();

        assert_matches!(
            set_status(&c, &b.id, TaskStatus::InProgress),
            Err(TaskError::InvalidArgument(msg)) if msg.contains("blocked by dependency")
        );
        assert_eq!(c.get_task(OWNER, &b.id).unwrap().task.status, TaskStatus::Todo);

        set_status(&c, &a.id, TaskStatus::Completed).unwrap();
        let view = set_status(&c, &b.id, TaskStatus::InProgress).unwrap();
        assert_eq!(view.task.status, TaskStatus::InProgress);
        assert_eq!(view.predecessor_dependencies.len(), 1);
    }

    #[test]
    fn revert_to_todo_always_allowed() {
        let c = coordinator();
        let a = create(&c, "A", None);
        let b = create(&c, "B", None);
        set_status(&c, &b.id, TaskStatus::Completed).unwrap();
        depend(&c, &a.id, &b.id).unwrap();

        let view = set_status(&c, &b.id, TaskStatus::Todo).unwrap();
        assert_eq!(view.task.status, TaskStatus::Todo);
        assert!(view.task.completed_at.is_none());
    }

    #[test]
    fn same_status_is_not_gated() {
        let c = coordinator();
        let a = create(&c, "A", None);
        let b = create(&c, "B", None);
        set_status(&c, &b.id, TaskStatus::InProgress).unwrap();
        depend(&c, &a.id, &b.id).unwrap();

        assert!(set_status(&c, &b.id, TaskStatus::InProgress).is_ok());
    }

    #[test]
    fn completed_at_stamped_and_cleared() {
        let c = coordinator();
        let t = create(&c, "T", None);
        let done = set_status(&c, &t.id, TaskStatus::Completed).unwrap();
        assert!(done.task.completed_at.is_some());

        let reopened = set_status(&c, &t.id, TaskStatus::InProgress).unwrap();
        assert!(reopened.task.completed_at.is_none());
    }

    // --- roll-up triggers ---

    #[test]
    fn child_status_change_rolls_parent_up() {
        let c = coordinator();
        let parent = create(&c, "P", None);
        let kids: Vec<Task> = (0..3)
            .map(|i| create(&c, &format!("c{i}"), Some(&parent.id)))
            .collect();
        set_status(&c, &kids[0].id, TaskStatus::Completed).unwrap();
        set_status(&c, &kids[1].id, TaskStatus::Completed).unwrap();

        let p = c.get_task(OWNER, &parent.id).unwrap().task;
        assert!((p.progress - 67.0).abs() < f64::EPSILON);
        assert_eq!(p.status, TaskStatus::InProgress);

        set_status(&c, &kids[2].id, TaskStatus::Completed).unwrap();
        let p = c.get_task(OWNER, &parent.id).unwrap().task;
        assert_eq!(p.status, TaskStatus::Completed);
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn reparent_recomputes_both_parents() {
        let c = coordinator();
        let old_parent = create(&c, "Old", None);
        let new_parent = create(&c, "New", None);
        let done = create(&c, "done", Some(&old_parent.id));
        create(&c, "open", Some(&old_parent.id));
        create(&c, "other", Some(&new_parent.id));
        set_status(&c, &done.id, TaskStatus::Completed).unwrap();

        c.update_task(
            OWNER,
            &done.id,
            &TaskUpdateParams {
                parent_task_id: Some(new_parent.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();

        let old = c.get_task(OWNER, &old_parent.id).unwrap();
        assert_eq!(old.sub_tasks.len(), 1);
        assert_eq!(old.task.status, TaskStatus::Todo);
        assert!(old.task.progress.abs() < f64::EPSILON);

        let new = c.get_task(OWNER, &new_parent.id).unwrap();
        assert_eq!(new.sub_tasks.len(), 2);
        assert!((new.task.progress - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn detach_with_empty_parent_id() {
        let c = coordinator();
        let parent = create(&c, "P", None);
        let child = create(&c, "C", Some(&parent.id));
        let view = c
            .update_task(
                OWNER,
                &child.id,
                &TaskUpdateParams {
                    parent_task_id: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(view.task.parent_task_id.is_none());
        assert!(c.list_subtasks(OWNER, &parent.id).unwrap().is_empty());
    }

    #[test]
    fn reparent_under_descendant_rolls_back_whole_update() {
        let c = coordinator();
        let root = create(&c, "Root", None);
        let child = create(&c, "Child", Some(&root.id));

        let result = c.update_task(
            OWNER,
            &root.id,
            &TaskUpdateParams {
                title: Some("Renamed".into()),
                parent_task_id: Some(child.id.clone()),
                ..Default::default()
            },
        );
        assert_matches!(result, Err(TaskError::InvalidArgument(msg)) if msg.contains("hierarchy cycle"));
        let root_now = c.get_task(OWNER, &root.id).unwrap().task;
        assert_eq!(root_now.title, "Root");
        assert!(root_now.parent_task_id.is_none());
    }

    #[test]
    fn recursive_mode_updates_grandparent() {
        let c = coordinator_with(EngineSettings {
            rollup_mode: RollupMode::Recursive,
            ..Default::default()
        });
        let grand = create(&c, "G", None);
        let parent = create(&c, "P", Some(&grand.id));
        let leaf = create(&c, "L", Some(&parent.id));
        set_status(&c, &leaf.id, TaskStatus::Completed).unwrap();

        assert_eq!(c.get_task(OWNER, &grand.id).unwrap().task.status, TaskStatus::Completed);
    }

    #[test]
    fn recompute_aggregate_is_idempotent() {
        let c = coordinator();
        let parent = create(&c, "P", None);
        let kid = create(&c, "k", Some(&parent.id));
        create(&c, "k2", Some(&parent.id));
        set_status(&c, &kid.id, TaskStatus::Completed).unwrap();

        let first = c.recompute_aggregate(OWNER, &parent.id).unwrap();
        let second = c.recompute_aggregate(OWNER, &parent.id).unwrap();
        assert_eq!(first, second);
    }

    // --- delete ---

    #[test]
    fn delete_removes_edges_and_rolls_parent_up() {
        let c = coordinator();
        let parent = create(&c, "P", None);
        let done = create(&c, "done", Some(&parent.id));
        let open = create(&c, "open", Some(&parent.id));
        let other = create(&c, "other", None);
        set_status(&c, &done.id, TaskStatus::Completed).unwrap();
        depend(&c, &other.id, &open.id).unwrap();
        depend(&c, &done.id, &other.id).unwrap();

        let outcome = c.delete_task(OWNER, &open.id).unwrap();
        assert_eq!(outcome.deleted_task_ids, vec![open.id.clone()]);
        assert_eq!(outcome.removed_dependency_count, 1);

        let p = c.get_task(OWNER, &parent.id).unwrap().task;
        assert_eq!(p.status, TaskStatus::Completed);
        assert!((p.progress - 100.0).abs() < f64::EPSILON);

        let deps = c.list_dependencies(OWNER, &other.id).unwrap();
        assert!(deps.successors.is_empty());
        assert_eq!(deps.predecessors.len(), 1);
    }

    #[test]
    fn delete_cascade_removes_subtree() {
        let c = coordinator();
        let root = create(&c, "Root", None);
        let mid = create(&c, "Mid", Some(&root.id));
        let leaf = create(&c, "Leaf", Some(&mid.id));
        let outside = create(&c, "Outside", None);
        depend(&c, &leaf.id, &outside.id).unwrap();

        let outcome = c.delete_task(OWNER, &root.id).unwrap();
        assert_eq!(outcome.deleted_task_ids.len(), 3);
        assert_eq!(outcome.removed_dependency_count, 1);
        assert_matches!(c.get_task(OWNER, &leaf.id), Err(TaskError::NotFound { .. }));
        assert!(c.list_dependencies(OWNER, &outside.id).unwrap().predecessors.is_empty());
    }

    #[test]
    fn delete_orphan_keeps_children() {
        let c = coordinator_with(EngineSettings {
            delete_policy: DeletePolicy::Orphan,
            ..Default::default()
        });
        let root = create(&c, "Root", None);
        let child = create(&c, "Child", Some(&root.id));
        set_status(&c, &child.id, TaskStatus::InProgress).unwrap();

        let outcome = c.delete_task(OWNER, &root.id).unwrap();
        assert_eq!(outcome.deleted_task_ids, vec![root.id.clone()]);

        let survivor = c.get_task(OWNER, &child.id).unwrap().task;
        assert!(survivor.parent_task_id.is_none());
        assert_eq!(survivor.status, TaskStatus::InProgress);
    }

    #[test]
    fn delete_foreign_task_is_not_found() {
        let c = coordinator();
        let t = create(&c, "Mine", None);
        assert_matches!(c.delete_task("user-2", &t.id), Err(TaskError::NotFound { .. }));
        assert!(c.get_task(OWNER, &t.id).is_ok());
    }

    // --- dependencies through the coordinator ---

    #[test]
    fn dependency_lifecycle() {
        let c = coordinator();
        let a = create(&c, "A", None);
        let b = create(&c, "B", None);
        let details = c
            .create_dependency(
                OWNER,
                &DependencyCreateParams {
                    predecessor_task_id: a.id.clone(),
                    successor_task_id: b.id.clone(),
                    dependency_type: Some(DependencyType::StartToStart),
                    lag: Some(2),
                },
            )
            .unwrap();
        assert_eq!(details.dependency.lag, Some(2));

        assert_matches!(depend(&c, &b.id, &a.id), Err(TaskError::InvalidArgument(_)));
        assert_matches!(depend(&c, &a.id, &b.id), Err(TaskError::Conflict(_)));
        assert_matches!(depend(&c, &a.id, &a.id), Err(TaskError::InvalidArgument(_)));

        // start-to-start does not gate
        assert!(set_status(&c, &b.id, TaskStatus::InProgress).is_ok());

        c.delete_dependency(OWNER, &details.dependency.id).unwrap();
        assert!(c.list_dependencies(OWNER, &a.id).unwrap().successors.is_empty());
    }

    #[test]
    fn list_subtasks_checks_owner() {
        let c = coordinator();
        let parent = create(&c, "P", None);
        create(&c, "c", Some(&parent.id));
        assert_eq!(c.list_subtasks(OWNER, &parent.id).unwrap().len(), 1);
        assert_matches!(
            c.list_subtasks("user-2", &parent.id),
            Err(TaskError::NotFound { .. })
        );
    }

    // --- concurrency ---

    #[test]
    fn concurrent_opposite_edges_admit_exactly_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let pool = new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            run_migrations(&conn).unwrap();
        }
        let c = TaskLifecycleCoordinator::new(pool, EngineSettings::default());

        for round in 0..10 {
            let a = create(&c, &format!("A{round}"), None);
            let b = create(&c, &format!("B{round}"), None);
            let results: Vec<bool> = std::thread::scope(|s| {
                let forward = s.spawn(|| depend(&c, &a.id, &b.id).is_ok());
                let backward = s.spawn(|| depend(&c, &b.id, &a.id).is_ok());
                vec![forward.join().unwrap(), backward.join().unwrap()]
            });
            assert_eq!(results.iter().filter(|ok| **ok).count(), 1, "round {round}");
        }
    }

    #[test]
    fn owner_lock_map_reuses_live_locks() {
        let c = coordinator();
        let first = c.acquire_owner_write_lock(OWNER).unwrap();
        let second = c.acquire_owner_write_lock(OWNER).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let other = c.acquire_owner_write_lock("user-2").unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
