//! Database connection pool management and schema bootstrap

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{config::DatabaseConfig, error::Result};

/// Catalog tables, in dependency order
///
/// `AUTOINCREMENT` keeps ids from being reused after a delete. Foreign keys
/// restrict deleting an author or category that still has books.
const SCHEMA: &[(&str, &str)] = &[
    (
        "authors",
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 50)
        )
        "#,
    ),
    (
        "categories",
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 50)
        )
        "#,
    ),
    (
        "books",
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 50),
            price_cents INTEGER NOT NULL,
            author_id INTEGER NOT NULL REFERENCES authors (id) ON DELETE RESTRICT,
            category_id INTEGER NOT NULL REFERENCES categories (id) ON DELETE RESTRICT
        )
        "#,
    ),
    (
        "books_author_id_idx",
        "CREATE INDEX IF NOT EXISTS books_author_id_idx ON books (author_id)",
    ),
    (
        "books_category_id_idx",
        "CREATE INDEX IF NOT EXISTS books_category_id_idx ON books (category_id)",
    ),
];

/// Create a SQLite connection pool with retry logic
///
/// Retries use exponential backoff starting at `retry_delay_secs`.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    create_pool_with_retries(config, config.max_retries).await
}

async fn create_pool_with_retries(config: &DatabaseConfig, max_retries: u32) -> Result<SqlitePool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        url = %sanitize_connection_url(&config.url),
                        "Database connection pool created: max={}, min={}",
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a database pool (single try)
async fn try_create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let url_safe = sanitize_connection_url(&config.url);
    let connect_failed = |e: sqlx::Error| {
        crate::error::Error::Internal(format!(
            "Failed to open database at '{}': {}\n\n\
            Troubleshooting:\n\
            1. Check the URL format: sqlite://path/to/library.db\n\
            2. Verify the directory exists and is writable\n\
            3. Set database.create_if_missing = true for a fresh deployment\n\n\
            Original error: {}",
            url_safe,
            categorize_db_error(&e),
            e
        ))
    };

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(connect_failed)?
        .create_if_missing(config.create_if_missing)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.connection_timeout_secs));

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect_with(options)
        .await
        .map_err(connect_failed)
}

/// Open a private in-memory catalog with the schema applied
///
/// The pool holds exactly one connection that is never recycled, since an
/// in-memory SQLite database lives only as long as its connection.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;
    Ok(pool)
}

/// Create catalog tables and indexes if they do not exist
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for (name, ddl) in SCHEMA {
        sqlx::query(ddl).execute(pool).await.map_err(|e| {
            crate::error::Error::Internal(format!("Failed to create {}: {}", name, e))
        })?;
    }

    tracing::info!("Catalog schema ready ({} objects)", SCHEMA.len());
    Ok(())
}

/// Sanitize connection URL for safe logging (remove password)
pub(crate) fn sanitize_connection_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..=scheme_end + 2];
            let after_at = &url[at_pos..];
            if let Some(colon_pos) = url[scheme_end + 3..at_pos].find(':') {
                let username = &url[scheme_end + 3..scheme_end + 3 + colon_pos];
                return format!("{}{}:***{}", scheme, username, after_at);
            }
        }
    }
    url.to_string()
}

/// Categorize database error for better user guidance
fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "Invalid database URL or options",
        Error::Database(_) => "Database rejected the connection",
        Error::Io(_) => "File I/O error - check the path and permissions",
        Error::PoolTimedOut => "Connection pool timeout - database may be locked",
        Error::PoolClosed => "Connection pool closed",
        Error::WorkerCrashed => "Database worker crashed",
        _ => "Connection error",
    }
}
