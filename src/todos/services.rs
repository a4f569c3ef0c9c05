use tracing::{debug, info};
use uuid::Uuid;

use super::{
    dto::{NewTodo, Page, Pagination, TodoFilter, TodoListResponse, TodoPatch},
    repo::{Todo, TodoStore},
};
use crate::error::AppError;

fn todo_not_found() -> AppError {
    AppError::not_found("Todo not found")
}

pub async fn create(store: &dyn TodoStore, owner: Uuid, todo: NewTodo) -> Result<Todo, AppError> {
    let todo = store.insert(owner, &todo).await?;
    info!(user_id = %owner, todo_id = todo.id, "todo created");
    Ok(todo)
}

pub async fn list(
    store: &dyn TodoStore,
    owner: Uuid,
    filter: TodoFilter,
    page: Page,
) -> Result<TodoListResponse, AppError> {
    let todos = store.list(owner, filter, page).await?;
    let total = store.count(owner, filter).await?;
    debug!(user_id = %owner, total, returned = todos.len(), "todos listed");
    Ok(TodoListResponse {
        todos,
        pagination: Pagination::new(page, total),
    })
}

pub async fn get(store: &dyn TodoStore, owner: Uuid, id: i64) -> Result<Todo, AppError> {
    store.find(owner, id).await?.ok_or_else(todo_not_found)
}

pub async fn update(
    store: &dyn TodoStore,
    owner: Uuid,
    id: i64,
    patch: TodoPatch,
) -> Result<Todo, AppError> {
    let todo = store
        .update(owner, id, &patch)
        .await?
        .ok_or_else(todo_not_found)?;
    info!(user_id = %owner, todo_id = id, "todo updated");
    Ok(todo)
}

pub async fn toggle(store: &dyn TodoStore, owner: Uuid, id: i64) -> Result<Todo, AppError> {
    let todo = store.toggle(owner, id).await?.ok_or_else(todo_not_found)?;
    info!(user_id = %owner, todo_id = id, completed = todo.completed, "todo toggled");
    Ok(todo)
}

pub async fn delete(store: &dyn TodoStore, owner: Uuid, id: i64) -> Result<(), AppError> {
    if !store.delete(owner, id).await? {
        return Err(todo_not_found());
    }
    info!(user_id = %owner, todo_id = id, "todo deleted");
    Ok(())
}
