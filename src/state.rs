// src/state.rs

use crate::store::SqlStore;
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for SqlStore {
    fn from_ref(state: &AppState) -> Self {
        SqlStore::new(state.pool.clone())
    }
}
