//! Catalog entities and their creation drafts
//!
//! Entities carry the storage-assigned `id`; drafts are the same shape
//! without it and are what callers hand to `create`.

use std::fmt;

use sqlx::FromRow;

use crate::repository::{
    BackReference, CatalogEntity, ColumnValue, EntityDescriptor, ForeignKey, References,
};

/// Monetary amount stored as whole cents
///
/// Signed on purpose: values that bypass boundary validation are still
/// persisted exactly as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Price(i64);

const SUB_CENT_TOLERANCE: f64 = 1e-6;

impl Price {
    /// Create a price from whole cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Convert a decimal amount with at most two fractional digits
    ///
    /// Returns `None` for NaN, infinities, amounts outside the `i64` cent
    /// range and amounts with a fraction of a cent. Binary float noise such
    /// as `19.99 * 100 == 1998.9999999999998` is not treated as a fraction.
    ///
    /// ```rust
    /// use catalog_service::model::Price;
    ///
    /// assert_eq!(Price::from_decimal(12.5), Some(Price::from_cents(1250)));
    /// assert_eq!(Price::from_decimal(19.99), Some(Price::from_cents(1999)));
    /// assert_eq!(Price::from_decimal(12.345), None);
    /// assert_eq!(Price::from_decimal(f64::NAN), None);
    /// ```
    #[must_use]
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let scaled = amount * 100.0;
        let cents = scaled.round();
        if (scaled - cents).abs() > SUB_CENT_TOLERANCE * cents.abs().max(1.0) {
            return None;
        }
        if cents < i64::MIN as f64 || cents >= i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    /// Amount in cents
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Amount as a decimal number for wire formats
    #[must_use]
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Whether the amount is strictly greater than zero
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// A person credited with one or more books
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

/// Author without an assigned id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub name: String,
}

/// Shelf grouping for books
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Category without an assigned id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
}

/// A catalogued title, always tied to one author and one category
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[sqlx(rename = "price_cents")]
    pub price: Price,
    pub author_id: i64,
    pub category_id: i64,
}

/// Book without an assigned id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub price: Price,
    pub author_id: i64,
    pub category_id: i64,
}

const BOOKS_BY_AUTHOR: BackReference = BackReference {
    entity: "Book",
    column: "author_id",
};

const BOOKS_BY_CATEGORY: BackReference = BackReference {
    entity: "Book",
    column: "category_id",
};

impl CatalogEntity for Author {
    type Draft = NewAuthor;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        name: "Author",
        table: "authors",
        columns: &["name"],
        foreign_keys: &[],
        referenced_by: &[BOOKS_BY_AUTHOR],
    };

    fn id(&self) -> i64 {
        self.id
    }

    fn draft_values(draft: Self::Draft) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(draft.name)]
    }

    fn into_values(self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.name)]
    }
}

impl CatalogEntity for Category {
    type Draft = NewCategory;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        name: "Category",
        table: "categories",
        columns: &["name"],
        foreign_keys: &[],
        referenced_by: &[BOOKS_BY_CATEGORY],
    };

    fn id(&self) -> i64 {
        self.id
    }

    fn draft_values(draft: Self::Draft) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(draft.name)]
    }

    fn into_values(self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.name)]
    }
}

impl CatalogEntity for Book {
    type Draft = NewBook;

    const DESCRIPTOR: EntityDescriptor = EntityDescriptor {
        name: "Book",
        table: "books",
        columns: &["title", "price_cents", "author_id", "category_id"],
        foreign_keys: &[
            ForeignKey {
                column: "author_id",
                references: "Author",
            },
            ForeignKey {
                column: "category_id",
                references: "Category",
            },
        ],
        referenced_by: &[],
    };

    fn id(&self) -> i64 {
        self.id
    }

    fn draft_values(draft: Self::Draft) -> Vec<ColumnValue> {
        vec![
            ColumnValue::Text(draft.title),
            ColumnValue::Integer(draft.price.cents()),
            ColumnValue::Integer(draft.author_id),
            ColumnValue::Integer(draft.category_id),
        ]
    }

    fn into_values(self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::Text(self.title),
            ColumnValue::Integer(self.price.cents()),
            ColumnValue::Integer(self.author_id),
            ColumnValue::Integer(self.category_id),
        ]
    }
}

impl References<Author> for Book {
    const COLUMN: &'static str = "author_id";
}

impl References<Category> for Book {
    const COLUMN: &'static str = "category_id";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(1250).to_string(), "12.50");
        assert_eq!(Price::from_cents(5).to_string(), "0.05");
        assert_eq!(Price::from_cents(0).to_string(), "0.00");
        assert_eq!(Price::from_cents(-75).to_string(), "-0.75");
    }

    #[test]
    fn test_price_from_decimal_exact_cents() {
        assert_eq!(Price::from_decimal(19.99), Some(Price::from_cents(1999)));
        assert_eq!(Price::from_decimal(0.1 + 0.2), Some(Price::from_cents(30)));
        assert_eq!(Price::from_decimal(12.345), None);
        assert_eq!(Price::from_decimal(9.999), None);
        assert_eq!(Price::from_decimal(-3.0), Some(Price::from_cents(-300)));
        assert_eq!(Price::from_decimal(f64::INFINITY), None);
        assert_eq!(Price::from_decimal(1e30), None);
    }

    #[test]
    fn test_price_as_decimal() {
        assert!((Price::from_cents(1999).as_decimal() - 19.99).abs() < f64::EPSILON);
        assert!(!Price::from_cents(0).is_positive());
        assert!(Price::from_cents(1).is_positive());
    }

    #[test]
    fn test_descriptor_columns_match_values() {
        let book = Book {
            id: 7,
            title: "Dune".to_string(),
            price: Price::from_cents(999),
            author_id: 1,
            category_id: 2,
        };
        assert_eq!(book.id(), 7);
        assert_eq!(
            Book::DESCRIPTOR.columns.len(),
            book.into_values().len()
        );
        assert_eq!(
            Author::DESCRIPTOR.columns.len(),
            Author::draft_values(NewAuthor {
                name: "Frank Herbert".to_string()
            })
            .len()
        );
    }

    #[test]
    fn test_back_references_point_at_books() {
        assert_eq!(Author::DESCRIPTOR.referenced_by[0].column, "author_id");
        assert_eq!(Category::DESCRIPTOR.referenced_by[0].column, "category_id");
        assert!(Book::DESCRIPTOR.referenced_by.is_empty());
    }
}
