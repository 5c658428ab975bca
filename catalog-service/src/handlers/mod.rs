//! HTTP boundary for the catalog
//!
//! Request bodies are validated here before any repository call; repository
//! failures are mapped onto status codes by [`ApiError`].
//!
//! # Routes
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/{collection}?page=&nr=` | one page in id order |
//! | GET | `/{collection}/{id}` | 404 when absent |
//! | POST | `/{collection}` | create from a body without `id` |
//! | PUT | `/{collection}` | replace the entity named by the body `id` |
//! | DELETE | `/{collection}/{id}` | 400 when absent or still referenced |
//! | GET | `/authors/{id}/books`, `/categories/{id}/books` | back-references |
//!
//! `{collection}` is one of `authors`, `categories` or `books`.

mod dto;
mod error;
mod query;
mod routes;
mod validation;

pub use dto::{BookDto, CreateBookDto, CreateNamedDto, NamedDto, PageResponse, WireEntity};
pub use error::{ApiError, ApiErrorKind, ApiErrorResponse, ApiOperation};
pub use query::{PageQuery, DEFAULT_PAGE};
pub use routes::{collection_routes, router};
pub use validation::{FieldError, Validator, MAX_NAME_LENGTH};
