use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::dto::{NewTodo, Page, TodoFilter, TodoPatch};
pub use super::repo_types::Todo;

const TODO_COLUMNS: &str =
    "id, user_id, title, description, completed, priority, due_date, created_at, updated_at";

// Keeps updated_at strictly increasing even for two writes in the same
// transaction clock tick.
const BUMP_UPDATED_AT: &str = "updated_at = GREATEST(now(), updated_at + interval '1 microsecond')";

/// Todo persistence. Every call is scoped by owner: rows belonging to other
/// users behave exactly like missing rows.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert(&self, owner: Uuid, todo: &NewTodo) -> anyhow::Result<Todo>;

    /// One page of the owner's todos, newest first.
    async fn list(&self, owner: Uuid, filter: TodoFilter, page: Page) -> anyhow::Result<Vec<Todo>>;

    async fn count(&self, owner: Uuid, filter: TodoFilter) -> anyhow::Result<i64>;

    async fn find(&self, owner: Uuid, id: i64) -> anyhow::Result<Option<Todo>>;

    /// Apply `patch` and bump `updated_at`. `None` when no owned row matched.
    async fn update(&self, owner: Uuid, id: i64, patch: &TodoPatch)
        -> anyhow::Result<Option<Todo>>;

    async fn toggle(&self, owner: Uuid, id: i64) -> anyhow::Result<Option<Todo>>;

    /// `false` when no owned row matched.
    async fn delete(&self, owner: Uuid, id: i64) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, owner: Uuid, filter: TodoFilter) {
    qb.push(" WHERE user_id = ").push_bind(owner);
    if let Some(completed) = filter.completed {
        qb.push(" AND completed = ").push_bind(completed);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn insert(&self, owner: Uuid, todo: &NewTodo) -> anyhow::Result<Todo> {
        let row = sqlx::query_as::<_, Todo>(&format!(
            r#"
            INSERT INTO todos (user_id, title, description, priority, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.priority)
        .bind(todo.due_date)
        .fetch_one(&self.db)
        .await
        .context("insert todo")?;
        Ok(row)
    }

    async fn list(&self, owner: Uuid, filter: TodoFilter, page: Page) -> anyhow::Result<Vec<Todo>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TODO_COLUMNS} FROM todos"));
        push_scope(&mut qb, owner, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<Todo>()
            .fetch_all(&self.db)
            .await
            .context("list todos")?;
        Ok(rows)
    }

    async fn count(&self, owner: Uuid, filter: TodoFilter) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM todos");
        push_scope(&mut qb, owner, filter);

        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await
            .context("count todos")?;
        Ok(total)
    }

    async fn find(&self, owner: Uuid, id: i64) -> anyhow::Result<Option<Todo>> {
        let row = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await
        .context("find todo")?;
        Ok(row)
    }

    async fn update(
        &self,
        owner: Uuid,
        id: i64,
        patch: &TodoPatch,
    ) -> anyhow::Result<Option<Todo>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE todos SET ");
        let mut set = qb.separated(", ");
        if let Some(title) = &patch.title {
            set.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(description) = &patch.description {
            set.push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(priority) = patch.priority {
            set.push("priority = ").push_bind_unseparated(priority);
        }
        if let Some(due_date) = patch.due_date {
            set.push("due_date = ").push_bind_unseparated(due_date);
        }
        if let Some(completed) = patch.completed {
            set.push("completed = ").push_bind_unseparated(completed);
        }
        set.push(BUMP_UPDATED_AT);

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(owner)
            .push(format!(" RETURNING {TODO_COLUMNS}"));

        let row = qb
            .build_query_as::<Todo>()
            .fetch_optional(&self.db)
            .await
            .context("update todo")?;
        Ok(row)
    }

    async fn toggle(&self, owner: Uuid, id: i64) -> anyhow::Result<Option<Todo>> {
        let row = sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE todos
               SET completed = NOT completed, {BUMP_UPDATED_AT}
             WHERE id = $1 AND user_id = $2
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await
        .context("toggle todo")?;
        Ok(row)
    }

    async fn delete(&self, owner: Uuid, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await
            .context("delete todo")?;
        Ok(result.rows_affected() > 0)
    }
}
