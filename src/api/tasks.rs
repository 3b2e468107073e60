//! Task endpoints. Every route sits behind the session gate and only ever
//! sees the authenticated user's own tasks.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch},
};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use super::validation::{validate_new_task, validate_task_update};
use crate::auth::{Auth, session_gate};
use crate::db::{Database, TaskFilter};
use crate::impl_has_auth_backend;
use crate::jwt::TokenIssuer;
use crate::model::{MessageResponse, NewTask, Pagination, Task, TaskPage, TaskQuery, TaskUpdate};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct TasksState {
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
}

impl_has_auth_backend!(TasksState);

pub fn router(state: TasksState) -> Router {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route(
            "/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/{id}/toggle", patch(toggle_task))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            session_gate,
        ))
        .with_state(state)
}

/// Resolved paging parameters: page is 1-based, limit is clamped.
fn paging(query: &TaskQuery) -> (u32, u32) {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

async fn list_tasks(
    State(state): State<TasksState>,
    Auth(user): Auth,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> Result<Json<TaskPage>, ApiError> {
    let Query(query) = query?;
    let (page, limit) = paging(&query);
    let filter = TaskFilter {
        status: query.status,
        search: query.search.filter(|s| !s.is_empty()),
    };

    let offset = u64::from(page - 1) * u64::from(limit);
    let tasks = state
        .db
        .tasks()
        .list(user.user_id(), &filter, limit, offset)
        .await
        .db_err("Failed to list tasks")?;
    let total = state
        .db
        .tasks()
        .count(user.user_id(), &filter)
        .await
        .db_err("Failed to count tasks")?;

    Ok(Json(TaskPage {
        tasks,
        pagination: Pagination {
            total,
            page,
            total_pages: total.div_ceil(u64::from(limit)),
        },
    }))
}

async fn create_task(
    State(state): State<TasksState>,
    Auth(user): Auth,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new_task) = payload?;
    validate_new_task(&new_task)?;

    let task = state
        .db
        .tasks()
        .create(
            user.user_id(),
            new_task.title.trim(),
            new_task.description.as_deref(),
        )
        .await
        .db_err("Failed to create task")?;

    info!(user_id = %user.principal, task_id = %task.id, "Created task");

    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<TasksState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .db
        .tasks()
        .get(&id, user.user_id())
        .await
        .db_err("Failed to get task")?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

async fn update_task(
    State(state): State<TasksState>,
    Auth(user): Auth,
    Path(id): Path<String>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(update) = payload?;
    validate_task_update(&update)?;

    let existing = state
        .db
        .tasks()
        .get(&id, user.user_id())
        .await
        .db_err("Failed to get task")?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    let title = update
        .title
        .as_deref()
        .map(str::trim)
        .unwrap_or(&existing.title);
    let description = update
        .description
        .as_deref()
        .or(existing.description.as_deref());
    let status = update.status.unwrap_or(existing.status);

    state
        .db
        .tasks()
        .update(&id, user.user_id(), title, description, status)
        .await
        .db_err("Failed to update task")?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

async fn toggle_task(
    State(state): State<TasksState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .db
        .tasks()
        .toggle_status(&id, user.user_id())
        .await
        .db_err("Failed to toggle task")?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

async fn delete_task(
    State(state): State<TasksState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .db
        .tasks()
        .delete(&id, user.user_id())
        .await
        .db_err("Failed to delete task")?;

    if !deleted {
        return Err(ApiError::not_found("Task not found"));
    }

    info!(user_id = %user.principal, task_id = %id, "Deleted task");

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}
