//! # taskflow-tasks
//!
//! Task dependency graph and hierarchy engine with `SQLite` persistence.
//!
//! - [`graph`]: typed dependency edges, cycle rejection, status gating
//! - [`hierarchy`]: parent/child links and progress/status roll-up
//! - [`service`]: [`TaskLifecycleCoordinator`], the atomic entry point
//! - [`store`]: the [`TaskStore`] seam the engines run against
//!
//! ## Crate Position
//!
//! Depends on `taskflow-core` and `taskflow-settings`.
//! Depended on by `taskflow-server` and the `taskflow` binary.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod graph;
pub mod hierarchy;
pub mod metrics;
pub mod migrations;
pub mod repository;
pub mod service;
pub mod store;
pub mod types;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory};
pub use errors::{Result, TaskError};
pub use graph::DependencyGraphEngine;
pub use hierarchy::{Aggregate, HierarchyEngine};
pub use migrations::run_migrations;
pub use service::TaskLifecycleCoordinator;
pub use store::{SqliteTaskStore, TaskStore};
pub use types::*;
