//! Task and dependency routes.
//!
//! Handlers are thin: extract the owner and payload, hand the synchronous
//! coordinator call to the blocking pool, and map the outcome to a status.

pub mod dependencies;
pub mod tasks;

use axum::Router;
use axum::routing::{delete, get, post};
use taskflow_tasks::TaskLifecycleCoordinator;

use crate::errors::ApiError;
use crate::server::AppState;

/// All task and dependency routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(tasks::create).get(tasks::list))
        .route(
            "/tasks/{id}",
            get(tasks::get).patch(tasks::update).delete(tasks::remove),
        )
        .route("/tasks/{id}/subtasks", get(tasks::subtasks))
        .route("/tasks/{id}/recompute", post(tasks::recompute))
        .route("/tasks/{id}/dependencies", get(dependencies::list))
        .route("/dependencies", post(dependencies::create))
        .route("/dependencies/{id}", delete(dependencies::remove))
}

/// Run a coordinator call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&TaskLifecycleCoordinator) -> taskflow_tasks::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let coordinator = state.coordinator.clone();
    tokio::task::spawn_blocking(move || f(&coordinator))
        .await
        .map_err(|e| ApiError::Internal {
            message: format!("task engine call panicked: {e}"),
        })?
        .map_err(ApiError::from)
}
