//! Query parameters for list endpoints
//!
//! ```rust
//! use catalog_service::handlers::PageQuery;
//!
//! let query = PageQuery { page: Some(3), nr: None };
//! assert_eq!(query.page_number(), 3);
//! assert_eq!(query.page_size(10), 10);
//! ```

use serde::{Deserialize, Serialize};

/// Page used when the request does not name one
pub const DEFAULT_PAGE: i64 = 1;

/// `?page=&nr=` on list endpoints
///
/// Values are passed through unchecked; the repository rejects a page or
/// page size below 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// 1-indexed page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nr: Option<i64>,
}

impl PageQuery {
    #[must_use]
    pub fn page_number(&self) -> i64 {
        self.page.unwrap_or(DEFAULT_PAGE)
    }

    /// Requested page size, or `default` when absent
    #[must_use]
    pub fn page_size(&self, default: i64) -> i64 {
        self.nr.unwrap_or(default)
    }
}
