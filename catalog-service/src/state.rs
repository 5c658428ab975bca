//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    model::{Author, Book, Category},
    repository::SqlRepository,
};

/// Configuration, pool and one repository per collection
///
/// Cloning is cheap: every field is reference counted internally.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    authors: SqlRepository<Author>,
    categories: SqlRepository<Category>,
    books: SqlRepository<Book>,
}

impl AppState {
    /// Build state on top of an already migrated pool
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        Self {
            config: Arc::new(config),
            authors: SqlRepository::new(pool.clone()),
            categories: SqlRepository::new(pool.clone()),
            books: SqlRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authors(&self) -> &SqlRepository<Author> {
        &self.authors
    }

    pub fn categories(&self) -> &SqlRepository<Category> {
        &self.categories
    }

    pub fn books(&self) -> &SqlRepository<Book> {
        &self.books
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.config.service.name)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.config)
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for SqlRepository<Author> {
    fn from_ref(state: &AppState) -> Self {
        state.authors.clone()
    }
}

impl FromRef<AppState> for SqlRepository<Category> {
    fn from_ref(state: &AppState) -> Self {
        state.categories.clone()
    }
}

impl FromRef<AppState> for SqlRepository<Book> {
    fn from_ref(state: &AppState) -> Self {
        state.books.clone()
    }
}
