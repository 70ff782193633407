//! Dependency handlers: create, list, delete.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use taskflow_tasks::{DependencyCreateParams, DependencyDetails, TaskDependencies};
use tracing::instrument;

use super::run_blocking;
use crate::errors::ApiError;
use crate::owner::OwnerId;
use crate::server::AppState;

/// POST /dependencies
#[instrument(skip_all, fields(owner_id = %owner.as_str()))]
pub async fn create(
    State(state): State<AppState>,
    owner: OwnerId,
    payload: Result<Json<DependencyCreateParams>, JsonRejection>,
) -> Result<(StatusCode, Json<DependencyDetails>), ApiError> {
    let Json(params) = payload?;
    let details =
        run_blocking(&state, move |c| c.create_dependency(owner.as_str(), &params)).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /tasks/{id}/dependencies
pub async fn list(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<TaskDependencies>, ApiError> {
    let deps = run_blocking(&state, move |c| c.list_dependencies(owner.as_str(), &id)).await?;
    Ok(Json(deps))
}

/// DELETE /dependencies/{id}
#[instrument(skip_all, fields(owner_id = %owner.as_str(), dependency_id = %id))]
pub async fn remove(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let _ = run_blocking(&state, move |c| c.delete_dependency(owner.as_str(), &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
