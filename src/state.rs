use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::todos::repo::{PgTodoStore, TodoStore};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub todos: Arc<dyn TodoStore>,
}

impl AppState {
    /// Wire the Postgres-backed stores.
    pub fn new(db: PgPool, config: Arc<AppConfig>) -> Self {
        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let todos = Arc::new(PgTodoStore::new(db)) as Arc<dyn TodoStore>;
        Self::from_parts(config, users, todos)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        todos: Arc<dyn TodoStore>,
    ) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            config,
            keys,
            users,
            todos,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::testing::{test_config, MemoryTodoStore, MemoryUserStore};

        Self::from_parts(
            Arc::new(test_config()),
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryTodoStore::default()),
        )
    }
}
