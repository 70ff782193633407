//! Dependency graph: edge creation with cycle prevention, and status gating.
//!
//! The graph is never materialised. Adjacency is read from the store one
//! node at a time (`successor_ids`), so a cycle check costs O(V + E) over
//! the reachable part of the owner's graph and holds no cross-references.

use std::collections::{HashSet, VecDeque};

use metrics::counter;
use tracing::debug;

use crate::errors::{Result, TaskError};
use crate::metrics::DEPENDENCY_REJECTIONS_TOTAL;
use crate::store::{TaskStore, require_owned_task};
use crate::types::{
    DependencyCreateParams, DependencyDetails, TaskDependencies, TaskDependency, TaskStatus,
};

fn reject(reason: &'static str, err: TaskError) -> TaskError {
    counter!(DEPENDENCY_REJECTIONS_TOTAL, "reason" => reason).increment(1);
    err
}

/// Operations over the directed dependency graph.
pub struct DependencyGraphEngine;

impl DependencyGraphEngine {
    /// Add an edge `predecessor → successor` for `owner_id`.
    ///
    /// Fails with `InvalidArgument` for a self-edge or an edge that would
    /// close a cycle, `NotFound` when either endpoint is missing or foreign,
    /// and `Conflict` when the ordered pair already exists.
    pub fn create_dependency(
        store: &dyn TaskStore,
        owner_id: &str,
        params: &DependencyCreateParams,
    ) -> Result<DependencyDetails> {
        let predecessor_id = params.predecessor_task_id.as_str();
        let successor_id = params.successor_task_id.as_str();

        if predecessor_id == successor_id {
            return Err(reject(
                "self_dependency",
                TaskError::InvalidArgument(format!("self-dependency on {predecessor_id}")),
            ));
        }

        let predecessor_task = require_owned_task(store, owner_id, predecessor_id)?;
        let successor_task = require_owned_task(store, owner_id, successor_id)?;

        if store.find_dependency(predecessor_id, successor_id)?.is_some() {
            return Err(reject(
                "duplicate",
                TaskError::Conflict(format!(
                    "duplicate dependency {predecessor_id} -> {successor_id}"
                )),
            ));
        }

        if Self::would_create_cycle(store, predecessor_id, successor_id)? {
            return Err(reject(
                "cycle",
                TaskError::InvalidArgument(format!(
                    "dependency {predecessor_id} -> {successor_id} would create cycle"
                )),
            ));
        }

        let dependency = store.insert_dependency(params)?;
        Ok(DependencyDetails {
            dependency,
            predecessor_task,
            successor_task,
        })
    }

    /// Whether adding `predecessor → successor` would close a cycle.
    ///
    /// Breadth-first search from `successor` along outgoing edges; reaching
    /// `predecessor` means a path back already exists.
    pub fn would_create_cycle(
        store: &dyn TaskStore,
        predecessor_id: &str,
        successor_id: &str,
    ) -> Result<bool> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::from([successor_id.to_string()]);

        while let Some(current) = queue.pop_front() {
            if current == predecessor_id {
                debug!(predecessor_id, successor_id, "cycle path found");
                return Ok(true);
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            queue.extend(
                store
                    .successor_ids(&current)?
                    .into_iter()
                    .filter(|next| !visited.contains(next)),
            );
        }

        Ok(false)
    }

    /// Edges around a task owned by `owner_id`.
    pub fn list_dependencies(
        store: &dyn TaskStore,
        owner_id: &str,
        task_id: &str,
    ) -> Result<TaskDependencies> {
        let _ = require_owned_task(store, owner_id, task_id)?;
        Ok(TaskDependencies {
            predecessors: Self::resolve_all(store, store.incoming(task_id)?)?,
            successors: Self::resolve_all(store, store.outgoing(task_id)?)?,
        })
    }

    /// Remove an edge. Both endpoints must belong to `owner_id`.
    pub fn delete_dependency(
        store: &dyn TaskStore,
        owner_id: &str,
        dependency_id: &str,
    ) -> Result<TaskDependency> {
        let dependency = store
            .get_dependency(dependency_id)?
            .ok_or_else(|| TaskError::dependency_not_found(dependency_id))?;

        for endpoint in [&dependency.predecessor_task_id, &dependency.successor_task_id] {
            if store.owner_of(endpoint)?.as_deref() != Some(owner_id) {
                return Err(TaskError::dependency_not_found(dependency_id));
            }
        }

        if !store.delete_dependency(dependency_id)? {
            return Err(TaskError::dependency_not_found(dependency_id));
        }
        Ok(dependency)
    }

    /// Whether `task_id` may move to `proposed`.
    ///
    /// `Todo` is always reachable. Any other target requires every
    /// finish-anchored predecessor to be `Completed`.
    pub fn can_transition_status(
        store: &dyn TaskStore,
        task_id: &str,
        proposed: TaskStatus,
    ) -> Result<bool> {
        Ok(Self::blocking_predecessors(store, task_id, proposed)?.is_empty())
    }

    /// Incoming edges that currently block `task_id` from reaching `proposed`.
    pub fn blocking_predecessors(
        store: &dyn TaskStore,
        task_id: &str,
        proposed: TaskStatus,
    ) -> Result<Vec<TaskDependency>> {
        match proposed {
            TaskStatus::Todo => return Ok(Vec::new()),
            TaskStatus::InProgress | TaskStatus::Completed => {}
        }

        let mut blocking = Vec::new();
        for edge in store.incoming(task_id)? {
            if !edge.dependency_type.requires_completed_predecessor() {
                continue;
            }
            let satisfied = store
                .get_task(&edge.predecessor_task_id)?
                .is_none_or(|pred| pred.status == TaskStatus::Completed);
            if !satisfied {
                blocking.push(edge);
            }
        }
        Ok(blocking)
    }

    fn resolve_all(
        store: &dyn TaskStore,
        edges: Vec<TaskDependency>,
    ) -> Result<Vec<DependencyDetails>> {
        edges
            .into_iter()
            .map(|dependency| -> Result<DependencyDetails> {
                let predecessor_task = store
                    .get_task(&dependency.predecessor_task_id)?
                    .ok_or_else(|| TaskError::task_not_found(&dependency.predecessor_task_id))?;
                let successor_task = store
                    .get_task(&dependency.successor_task_id)?
                    .ok_or_else(|| TaskError::task_not_found(&dependency.successor_task_id))?;
                Ok(DependencyDetails {
                    dependency,
                    predecessor_task,
                    successor_task,
                })
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
