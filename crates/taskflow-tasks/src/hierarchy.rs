//! Parent/child trees and progress roll-up.
//!
//! A parent's `progress`, `status` and `completed_at` are derived from its
//! direct children whenever the coordinator calls
//! [`HierarchyEngine::roll_up`]. A parent with no children is never
//! touched, so leaf tasks keep whatever status a person gave them.

use std::collections::{HashSet, VecDeque};

use metrics::counter;
use taskflow_core::ids::now_iso;
use taskflow_settings::RollupMode;
use tracing::debug;

use crate::errors::{Result, TaskError};
use crate::metrics::ROLLUPS_TOTAL;
use crate::store::{TaskStore, require_owned_task};
use crate::types::{Task, TaskChanges, TaskStatus};

/// Values derived from a set of children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    /// `round(100 * completed / total)`.
    pub progress: f64,
    /// `Completed` when all children are, `InProgress` when some are,
    /// `Todo` when none are.
    pub status: TaskStatus,
}

/// Derive the aggregate for a parent. `None` when there are no children.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate(children: &[Task]) -> Option<Aggregate> {
    if children.is_empty() {
        return None;
    }
    let total = children.len();
    let completed = children
        .iter()
        .filter(|child| child.status == TaskStatus::Completed)
        .count();

    let status = if completed == total {
        TaskStatus::Completed
    } else if completed > 0 {
        TaskStatus::InProgress
    } else {
        TaskStatus::Todo
    };

    Some(Aggregate {
        progress: (100.0 * completed as f64 / total as f64).round(),
        status,
    })
}

/// Operations over the parent/child hierarchy.
pub struct HierarchyEngine;

impl HierarchyEngine {
    /// Check that `parent_id` can take `child_id` as a child for `owner_id`.
    ///
    /// Pass `child_id = None` for a task that does not exist yet; only the
    /// parent's existence and ownership are checked then. Returns the parent.
    pub fn validate_parent(
        store: &dyn TaskStore,
        owner_id: &str,
        child_id: Option<&str>,
        parent_id: &str,
    ) -> Result<Task> {
        let parent = match store.get_task(parent_id)? {
            Some(task) if task.owner_id == owner_id => task,
            _ => return Err(TaskError::parent_not_found(parent_id)),
        };

        let Some(child_id) = child_id else {
            return Ok(parent);
        };
        if parent_id == child_id {
            return Err(TaskError::InvalidArgument(format!(
                "task {child_id} cannot be its own parent"
            )));
        }

        // Walk up from the proposed parent; meeting the child means the
        // parent sits inside the child's subtree.
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor = parent.parent_task_id.clone();
        while let Some(ancestor_id) = cursor {
            if ancestor_id == child_id {
                return Err(TaskError::InvalidArgument(format!(
                    "task {parent_id} is a descendant of {child_id}; would create hierarchy cycle"
                )));
            }
            if !seen.insert(ancestor_id.clone()) {
                break;
            }
            cursor = store
                .get_task(&ancestor_id)?
                .and_then(|ancestor| ancestor.parent_task_id);
        }

        Ok(parent)
    }

    /// Make `child_id` a child of `parent_id`. Returns the updated child.
    ///
    /// Does not recompute aggregates; the caller re-runs roll-up for the old
    /// and new parents.
    pub fn attach_child(
        store: &dyn TaskStore,
        owner_id: &str,
        child_id: &str,
        parent_id: &str,
    ) -> Result<Task> {
        let child = require_owned_task(store, owner_id, child_id)?;
        let _ = Self::validate_parent(store, owner_id, Some(child_id), parent_id)?;
        if child.parent_task_id.as_deref() == Some(parent_id) {
            return Ok(child);
        }
        Self::set_parent(store, child_id, Some(parent_id.to_string()))
    }

    /// Detach `child_id` from its parent. Returns the updated child.
    pub fn detach_child(store: &dyn TaskStore, owner_id: &str, child_id: &str) -> Result<Task> {
        let child = require_owned_task(store, owner_id, child_id)?;
        if child.parent_task_id.is_none() {
            return Ok(child);
        }
        Self::set_parent(store, child_id, None)
    }

    fn set_parent(store: &dyn TaskStore, child_id: &str, parent_id: Option<String>) -> Result<Task> {
        store
            .update_task(
                child_id,
                &TaskChanges {
                    parent_task_id: Some(parent_id),
                    ..Default::default()
                },
            )?
            .ok_or_else(|| TaskError::task_not_found(child_id))
    }

    /// Recompute one parent from its direct children.
    ///
    /// Returns `None` (and writes nothing) when the parent has no children.
    /// Writes nothing either when the derived values already match, so
    /// repeated calls leave the row byte-for-byte identical.
    pub fn recompute_parent_aggregate(store: &dyn TaskStore, parent_id: &str) -> Result<Option<Task>> {
        let parent = store
            .get_task(parent_id)?
            .ok_or_else(|| TaskError::parent_not_found(parent_id))?;
        let children = store.children(parent_id)?;
        let Some(agg) = aggregate(&children) else {
            return Ok(None);
        };
        counter!(ROLLUPS_TOTAL).increment(1);

        let completed_at = match agg.status {
            TaskStatus::Completed if parent.status == TaskStatus::Completed => {
                parent.completed_at.clone().or_else(|| Some(now_iso()))
            }
            TaskStatus::Completed => Some(now_iso()),
            TaskStatus::Todo | TaskStatus::InProgress => None,
        };

        #[allow(clippy::float_cmp)]
        let unchanged = parent.progress == agg.progress
            && parent.status == agg.status
            && parent.completed_at == completed_at;
        if unchanged {
            return Ok(Some(parent));
        }

        debug!(
            parent_id,
            children = children.len(),
            progress = agg.progress,
            status = %agg.status,
            "parent aggregate recomputed"
        );
        store
            .update_task(
                parent_id,
                &TaskChanges {
                    progress: Some(agg.progress),
                    status: Some(agg.status),
                    completed_at: Some(completed_at),
                    ..Default::default()
                },
            )?
            .map(Some)
            .ok_or_else(|| TaskError::parent_not_found(parent_id))
    }

    /// Recompute `parent_id` and, in recursive mode, every ancestor above it.
    ///
    /// Returns the parents that were recomputed, nearest first.
    pub fn roll_up(store: &dyn TaskStore, parent_id: &str, mode: RollupMode) -> Result<Vec<Task>> {
        let mut updated = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor = Some(parent_id.to_string());

        while let Some(current) = cursor.take() {
            if !seen.insert(current.clone()) {
                break;
            }
            let Some(parent) = Self::recompute_parent_aggregate(store, &current)? else {
                break;
            };
            cursor = match mode {
                RollupMode::SingleLevel => None,
                RollupMode::Recursive => parent.parent_task_id.clone(),
            };
            updated.push(parent);
        }

        Ok(updated)
    }

    /// Every task below `root_id`, breadth-first.
    pub fn descendants(store: &dyn TaskStore, root_id: &str) -> Result<Vec<Task>> {
        let mut found = Vec::new();
        let mut seen: HashSet<String> = HashSet::from([root_id.to_string()]);
        let mut queue = VecDeque::from([root_id.to_string()]);

        while let Some(current) = queue.pop_front() {
            for child in store.children(&current)? {
                if seen.insert(child.id.clone()) {
                    queue.push_back(child.id.clone());
                    found.push(child);
                }
            }
        }

        Ok(found)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
