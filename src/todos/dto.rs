use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::Todo;

pub const DEFAULT_PRIORITY: i32 = 1;
pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Validated input for a new todo.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub priority: i32,
    pub due_date: Option<OffsetDateTime>,
}

/// Partial update. The outer `Option` records whether a field was sent at
/// all; for nullable columns the inner `Option` distinguishes a new value
/// from an explicit `null` that clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<i32>,
    pub due_date: Option<Option<OffsetDateTime>>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
    }
}

/// Conjunctive list filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub completed: Option<bool>,
    pub priority: Option<i32>,
}

#[cfg(test)]
impl TodoFilter {
    pub fn matches(&self, todo: &Todo) -> bool {
        self.completed.map_or(true, |c| todo.completed == c)
            && self.priority.map_or(true, |p| todo.priority == p)
    }
}

/// Raw `GET /api/todos` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub completed: Option<String>,
    pub priority: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    /// Rows to skip. Pages past the end saturate instead of overflowing.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: (total + page.limit - 1) / page.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub todo: Todo,
}

#[derive(Debug, Serialize)]
pub struct TodoMessageResponse {
    pub message: &'static str,
    pub todo: Todo,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
