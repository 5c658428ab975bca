//! # catalog-service
//!
//! Backend for a small library catalog: books, their authors and the
//! categories they are shelved under, stored in SQLite and served over HTTP.
//!
//! ## Features
//!
//! - **Repositories**: one generic paginated repository per entity, with
//!   foreign keys enforced by storage
//! - **HTTP API**: list, get, create, update and delete per collection, plus
//!   back-reference listings
//! - **Middleware stack**: request ids, sensitive header masking, timeouts,
//!   body limits, compression, panic recovery
//! - **Health checks**: liveness and readiness probes
//! - **Graceful shutdown**: SIGTERM and SIGINT
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let pool = create_pool(&config.database).await?;
//!     apply_schema(&pool).await?;
//!
//!     let app = router(AppState::new(config.clone(), pool));
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod model;
pub mod observability;
pub mod repository;
pub mod server;
pub mod state;

/// Commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::database::{apply_schema, connect_in_memory, create_pool};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{router, ApiError};
    pub use crate::model::{Author, Book, Category, NewAuthor, NewBook, NewCategory, Price};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        PaginatedList, RelationLoader, Repository, RepositoryError, RepositoryErrorKind,
        SqlRepository,
    };
    pub use crate::server::Server;
    pub use crate::state::AppState;
}
