//! # taskflow-server
//!
//! Axum HTTP surface for the task engine.
//!
//! - Task, sub-task and dependency routes over [`TaskLifecycleCoordinator`]
//! - Owner identity from the `x-owner-id` header
//! - Error-to-status mapping with a `{ code, message }` body
//! - `/health` and Prometheus `/metrics`
//! - Graceful shutdown via `CancellationToken`
//!
//! ## Crate Position
//!
//! Depends on `taskflow-tasks` and `taskflow-settings`.
//! Depended on by the `taskflow` binary.
//!
//! [`TaskLifecycleCoordinator`]: taskflow_tasks::TaskLifecycleCoordinator

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod owner;
pub mod routes;
pub mod server;
pub mod shutdown;
