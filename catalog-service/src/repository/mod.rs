//! Paginated repositories for catalog entities
//!
//! One generic [`SqlRepository`] serves authors, categories and books. What
//! differs per entity lives in its [`EntityDescriptor`]; foreign-key rules are
//! enforced by storage and surface as
//! [`RepositoryErrorKind::ConstraintViolation`].
//!
//! # Features
//!
//! - **CRUD**: [`Repository`] with create, get-by-id, list, update and delete
//! - **Pagination**: [`paginate`] and [`PaginatedList`] for whole-table paging
//! - **Back-references**: [`RelationLoader`] for children that point at a parent
//! - **Errors**: [`RepositoryError`] classified from driver failures
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_service::model::{Book, NewBook, Price};
//! use catalog_service::repository::{Repository, RepositoryErrorKind, SqlRepository};
//!
//! let books: SqlRepository<Book> = SqlRepository::new(pool);
//! let err = books
//!     .create(NewBook {
//!         title: "Orphan".into(),
//!         price: Price::from_cents(500),
//!         author_id: 999,
//!         category_id: 1,
//!     })
//!     .await
//!     .unwrap_err();
//! assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
//! ```

mod entity;
mod error;
mod pagination;
mod sql;
mod traits;

pub use entity::{BackReference, CatalogEntity, ColumnValue, EntityDescriptor, ForeignKey};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use pagination::{paginate, PageRequest, PageWindow, PaginatedList};
pub use sql::SqlRepository;
pub use traits::{References, RelationLoader, Repository, RepositoryResult};
