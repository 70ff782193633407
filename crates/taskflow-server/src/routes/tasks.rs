//! Task handlers: create, list, get, update, delete, subtasks, recompute.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use taskflow_tasks::{
    DeleteOutcome, Task, TaskCreateParams, TaskFilter, TaskUpdateParams, TaskView,
};
use tracing::instrument;

use super::run_blocking;
use crate::errors::ApiError;
use crate::owner::OwnerId;
use crate::server::AppState;

/// POST /tasks
#[instrument(skip_all, fields(owner_id = %owner.as_str()))]
pub async fn create(
    State(state): State<AppState>,
    owner: OwnerId,
    payload: Result<Json<TaskCreateParams>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskView>), ApiError> {
    let Json(params) = payload?;
    let view = run_blocking(&state, move |c| c.create_task(owner.as_str(), &params)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /tasks
pub async fn list(
    State(state): State<AppState>,
    owner: OwnerId,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let Query(filter) = filter?;
    let tasks = run_blocking(&state, move |c| c.list_tasks(owner.as_str(), &filter)).await?;
    Ok(Json(tasks))
}

/// GET /tasks/{id}
pub async fn get(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<TaskView>, ApiError> {
    let view = run_blocking(&state, move |c| c.get_task(owner.as_str(), &id)).await?;
    Ok(Json(view))
}

/// PATCH /tasks/{id}
#[instrument(skip_all, fields(owner_id = %owner.as_str(), task_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
    payload: Result<Json<TaskUpdateParams>, JsonRejection>,
) -> Result<Json<TaskView>, ApiError> {
    let Json(patch) = payload?;
    let view = run_blocking(&state, move |c| c.update_task(owner.as_str(), &id, &patch)).await?;
    Ok(Json(view))
}

/// DELETE /tasks/{id}
#[instrument(skip_all, fields(owner_id = %owner.as_str(), task_id = %id))]
pub async fn remove(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let outcome = run_blocking(&state, move |c| c.delete_task(owner.as_str(), &id)).await?;
    Ok(Json(outcome))
}

/// GET /tasks/{id}/subtasks
pub async fn subtasks(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = run_blocking(&state, move |c| c.list_subtasks(owner.as_str(), &id)).await?;
    Ok(Json(tasks))
}

/// POST /tasks/{id}/recompute
pub async fn recompute(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<TaskView>, ApiError> {
    let view = run_blocking(&state, move |c| c.recompute_aggregate(owner.as_str(), &id)).await?;
    Ok(Json(view))
}
