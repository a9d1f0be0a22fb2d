//! Task endpoints under `<prefix>/v1`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use cadence_core::{NewTask, Task};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;
use crate::http::error::ApiError;

type ApiResult<T> = Result<T, ApiError>;

/// GET /task/{id}
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.engine.get_one(&id)?))
}

/// POST /task: validate, persist and schedule a new task.
pub async fn insert(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(new_task) = body?;
    let id = state.engine.insert(new_task)?;
    info!(task_id = %id, "task created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": format!("Created Task With ID : {id}") })),
    ))
}

/// DELETE /task/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.engine.delete(&id)?;
    Ok(Json(json!({ "message": format!("Deleted Task With ID : {id}") })))
}

/// PATCH /task/{id}/toggle
pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let enable = state.engine.toggle(&id)?;
    Ok(Json(json!({
        "message": format!("Toggled Task With ID : {id}"),
        "enable": enable,
    })))
}

/// POST /task/{id}/execute: run now, outside the schedule.
pub async fn execute_now(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if state.engine.execute_now(&id)? {
        Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "message": format!("Executing Task With ID : {id}"),
                "executed": true,
            })),
        ))
    } else {
        Ok((
            StatusCode::OK,
            Json(json!({
                "message": format!("Task With ID : {id} is finished or expired"),
                "executed": false,
            })),
        ))
    }
}

/// POST /restart: drop every live registration and reload active tasks.
pub async fn restart(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let scheduled = state.engine.restart()?;
    Ok(Json(json!({
        "message": "Restarted Scheduler",
        "scheduled": scheduled,
    })))
}
