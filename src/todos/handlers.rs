use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ListQuery, MessageResponse, TodoListResponse, TodoMessageResponse, TodoResponse},
    services,
    validate::{list_params, new_todo, parse_todo_id, todo_patch},
};
use crate::{auth::AuthUser, error::AppError, sanitize::SanitizedJson, state::AppState};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route(
            "/api/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/api/todos/:id/toggle", patch(toggle_todo))
}

#[instrument(skip(state, body))]
pub async fn create_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    SanitizedJson(body): SanitizedJson,
) -> Result<(StatusCode, Json<TodoMessageResponse>), AppError> {
    let input = new_todo(&body)?;
    let todo = services::create(state.todos.as_ref(), auth.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(TodoMessageResponse {
            message: "Todo created successfully",
            todo,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<TodoListResponse>, AppError> {
    let (filter, page) = list_params(&query);
    let listing = services::list(state.todos.as_ref(), auth.user_id, filter, page).await?;
    Ok(Json(listing))
}

#[instrument(skip(state))]
pub async fn get_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TodoResponse>, AppError> {
    let id = parse_todo_id(&id)?;
    let todo = services::get(state.todos.as_ref(), auth.user_id, id).await?;
    Ok(Json(TodoResponse { todo }))
}

#[instrument(skip(state, body))]
pub async fn update_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    SanitizedJson(body): SanitizedJson,
) -> Result<Json<TodoMessageResponse>, AppError> {
    let id = parse_todo_id(&id)?;
    let patch = todo_patch(&body)?;
    let todo = services::update(state.todos.as_ref(), auth.user_id, id, patch).await?;
    Ok(Json(TodoMessageResponse {
        message: "Todo updated successfully",
        todo,
    }))
}

#[instrument(skip(state))]
pub async fn toggle_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TodoMessageResponse>, AppError> {
    let id = parse_todo_id(&id)?;
    let todo = services::toggle(state.todos.as_ref(), auth.user_id, id).await?;
    Ok(Json(TodoMessageResponse {
        message: "Todo completion status toggled",
        todo,
    }))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_todo_id(&id)?;
    services::delete(state.todos.as_ref(), auth.user_id, id).await?;
    Ok(Json(MessageResponse {
        message: "Todo deleted successfully",
    }))
}
