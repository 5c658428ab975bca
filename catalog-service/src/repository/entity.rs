//! Entity descriptors
//!
//! A descriptor is the only thing that differs between the catalog's
//! repositories: table, mutable columns, and the foreign keys pointing in
//! and out. [`SqlRepository`](super::SqlRepository) renders all of its SQL
//! from it.

use sqlx::{sqlite::SqliteRow, FromRow};

/// A foreign key held by an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Column holding the referenced id
    pub column: &'static str,
    /// Name of the referenced entity
    pub references: &'static str,
}

/// A foreign key held by another entity that points at this one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackReference {
    /// Name of the referencing entity
    pub entity: &'static str,
    /// Column in that table holding this entity's id
    pub column: &'static str,
}

/// Static description of how an entity is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Entity name used in errors and logs
    pub name: &'static str,
    /// Storage table
    pub table: &'static str,
    /// Mutable columns, excluding `id`, in binding order
    pub columns: &'static [&'static str],
    /// Foreign keys held by this entity
    pub foreign_keys: &'static [ForeignKey],
    /// Foreign keys elsewhere that restrict deleting this entity
    pub referenced_by: &'static [BackReference],
}

impl EntityDescriptor {
    /// `id` followed by the mutable columns, comma separated
    pub(crate) fn select_list(&self) -> String {
        std::iter::once("id")
            .chain(self.columns.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Message for a write rejected by one of this entity's foreign keys
    pub(crate) fn dangling_reference_message(&self) -> String {
        let targets = self
            .foreign_keys
            .iter()
            .map(|fk| format!("{} ({})", fk.references, fk.column))
            .collect::<Vec<_>>()
            .join(" or ");
        format!("{} references a {} that does not exist", self.name, targets)
    }

    /// Message for a delete rejected because other rows still point here
    pub(crate) fn still_referenced_message(&self, id: i64) -> String {
        let referrers = self
            .referenced_by
            .iter()
            .map(|r| r.entity)
            .collect::<Vec<_>>()
            .join(" or ");
        format!("{} {} is still referenced by {} rows", self.name, id, referrers)
    }
}

/// A value bound to one mutable column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Text(String),
    Integer(i64),
}

/// An entity the generic repository can persist
///
/// Implementors return column values in the same order as
/// [`EntityDescriptor::columns`].
pub trait CatalogEntity:
    for<'r> FromRow<'r, SqliteRow> + Clone + Send + Sync + Unpin + 'static
{
    /// The entity without its storage-assigned id
    type Draft: Send + 'static;

    /// How the entity is stored
    const DESCRIPTOR: EntityDescriptor;

    /// Primary key
    fn id(&self) -> i64;

    /// Column values for inserting a draft
    fn draft_values(draft: Self::Draft) -> Vec<ColumnValue>;

    /// Column values for overwriting the stored row
    fn into_values(self) -> Vec<ColumnValue>;
}
