use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::tasks::dto::{CreateTaskRequest, TaskData, TaskListData, UpdateTaskRequest};
use crate::validation::{validate_description, validate_title};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/me/tasks", get(list_tasks).post(create_task))
        .route("/users/me/tasks/:task_id", put(update_task).delete(delete_task))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<TaskListData>>, ApiError> {
    let tasks = state.store.list_tasks(user_id).await?;
    Ok(Json(ApiResponse::ok(
        "Tasks fetched successfully",
        TaskListData { tasks },
    )))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TaskData>>), ApiError> {
    validate_title(&payload.title)?;
    if let Some(description) = &payload.description {
        validate_description(description)?;
    }

    let task = state
        .store
        .create_task(user_id, payload.into_new_task())
        .await?;

    info!(%user_id, task_id = %task.id, "task created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Task created successfully", TaskData { task })),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<ApiResponse<TaskData>>, ApiError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    if let Some(description) = &payload.description {
        validate_description(description)?;
    }

    let task = state
        .store
        .update_task(user_id, task_id, payload.into_patch())
        .await?;

    info!(%user_id, %task_id, "task updated");
    Ok(Json(ApiResponse::ok(
        "Task updated successfully",
        TaskData { task },
    )))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.store.delete_task(user_id, task_id).await?;

    info!(%user_id, %task_id, "task deleted");
    Ok(Json(ApiResponse::message("Task deleted successfully")))
}
