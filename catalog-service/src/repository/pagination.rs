//! Page window arithmetic and the paginated result container
//!
//! # Example
//!
//! ```rust
//! use catalog_service::repository::paginate;
//!
//! let window = paginate(25, 3, 10).unwrap();
//! assert_eq!(window.offset, 20);
//! assert_eq!(window.limit, 10);
//! assert_eq!(window.total_pages, 3);
//! ```

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::RepositoryResult;

/// Slice of an ordered collection to fetch, plus how many pages exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Number of rows to skip
    pub offset: i64,
    /// Maximum number of rows to return
    pub limit: i64,
    /// `ceil(total_count / page_size)`, zero for an empty collection
    pub total_pages: u64,
}

/// A validated request for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    /// Validate a 1-indexed `page` of `page_size` items
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryErrorKind::InvalidArgument`](super::RepositoryErrorKind::InvalidArgument)
    /// when `page` or `page_size` is zero or negative.
    pub fn new(page: i64, page_size: i64) -> RepositoryResult<Self> {
        if page < 1 {
            return Err(RepositoryError::invalid_argument(
                RepositoryOperation::List,
                format!("page must be at least 1, got {}", page),
            ));
        }
        if page_size < 1 {
            return Err(RepositoryError::invalid_argument(
                RepositoryOperation::List,
                format!("page size must be at least 1, got {}", page_size),
            ));
        }
        Ok(Self { page, page_size })
    }

    /// The requested page number
    #[must_use]
    pub const fn page(&self) -> i64 {
        self.page
    }

    /// The requested page size
    #[must_use]
    pub const fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Window over a collection of `total_count` rows
    ///
    /// Pages past the end are not clamped: they produce an offset beyond the
    /// collection and therefore an empty page, while `total_pages` stays exact.
    #[must_use]
    pub fn window(&self, total_count: u64) -> PageWindow {
        PageWindow {
            offset: (self.page - 1).saturating_mul(self.page_size),
            limit: self.page_size,
            total_pages: total_count.div_ceil(self.page_size.unsigned_abs()),
        }
    }
}

/// Compute the window for a 1-indexed `page` of `page_size` items
///
/// # Errors
///
/// Same as [`PageRequest::new`].
pub fn paginate(total_count: u64, page: i64, page_size: i64) -> RepositoryResult<PageWindow> {
    Ok(PageRequest::new(page, page_size)?.window(total_count))
}

/// One page of entities in storage order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedList<T> {
    /// Items on this page, in natural order
    pub items: Vec<T>,
    /// The page that was requested (1-indexed)
    pub page: i64,
    /// Total number of pages at the time of the query
    pub total_pages: u64,
}

impl<T> PaginatedList<T> {
    /// Create a page from fetched items and the window used to fetch them
    pub fn new(items: Vec<T>, page: i64, total_pages: u64) -> Self {
        Self {
            items,
            page,
            total_pages,
        }
    }

    /// Map every item, keeping the paging metadata
    ///
    /// ```rust
    /// use catalog_service::repository::PaginatedList;
    ///
    /// let page = PaginatedList::new(vec![1, 2, 3], 1, 1);
    /// let doubled = page.map(|n| n * 2);
    /// assert_eq!(doubled.items, vec![2, 4, 6]);
    /// ```
    pub fn map<U, F>(self, f: F) -> PaginatedList<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedList {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            total_pages: self.total_pages,
        }
    }
}
