//! Repository contracts
//!
//! Both traits use return-position `impl Future + Send` so implementations
//! can be written as plain `async fn` and still be driven from axum handlers.

use std::future::Future;

use super::entity::CatalogEntity;
use super::error::RepositoryError;
use super::pagination::PaginatedList;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// CRUD contract shared by every catalog entity
///
/// Each call is its own unit of work: a successful `create`, `update` or
/// `delete` is visible to every later read.
///
/// # Example
///
/// ```rust,ignore
/// use catalog_service::model::{Author, NewAuthor};
/// use catalog_service::repository::{Repository, SqlRepository};
///
/// let authors: SqlRepository<Author> = SqlRepository::new(pool);
/// let created = authors.create(NewAuthor { name: "Ursula K. Le Guin".into() }).await?;
/// let page = authors.list(1, 10).await?;
/// assert_eq!(page.items[0], created);
/// ```
pub trait Repository<E: CatalogEntity>: Send + Sync {
    /// Persist a new entity and return it with its assigned id
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` when storage rejects the row, e.g. a book whose
    /// author or category does not exist.
    fn create(&self, draft: E::Draft) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Read an entity by id
    ///
    /// Absence is `Ok(None)`, never an error.
    fn get_by_id(&self, id: i64) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;

    /// Read one page of entities in ascending id order
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `page` or `page_size` is below 1. Arguments are
    /// checked before storage is touched.
    fn list(
        &self,
        page: i64,
        page_size: i64,
    ) -> impl Future<Output = RepositoryResult<PaginatedList<E>>> + Send;

    /// Overwrite every mutable field of the stored row identified by `entity.id()`
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has that id (nothing is written), or
    /// `ConstraintViolation` when the new values are rejected by storage.
    fn update(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Remove an entity
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has that id, or `ConstraintViolation` when other
    /// rows still reference it. In both cases nothing is removed.
    fn delete(&self, id: i64) -> impl Future<Output = RepositoryResult<()>> + Send;
}

/// Loads the children that reference a parent entity
///
/// Back-references are derived by query rather than stored on the parent.
///
/// # Type Parameters
///
/// - `Parent`: the referenced entity (e.g. `Author`)
/// - `Child`: the referencing entity (e.g. `Book`)
pub trait RelationLoader<Parent, Child>: Send + Sync {
    /// All children referencing `parent_id`, in ascending id order
    fn load_many(
        &self,
        parent_id: i64,
    ) -> impl Future<Output = RepositoryResult<Vec<Child>>> + Send;

    /// Number of children referencing `parent_id`
    fn count(&self, parent_id: i64) -> impl Future<Output = RepositoryResult<u64>> + Send;
}

/// Declares which column of `Self` holds a `Parent` id
pub trait References<Parent>: CatalogEntity {
    /// Foreign key column on `Self`'s table
    const COLUMN: &'static str;
}
