//! Repository error types
//!
//! Every storage failure is classified into a [`RepositoryErrorKind`] before
//! it leaves the repository, so callers can decide on a response without
//! inspecting driver errors.
//!
//! # Example
//!
//! ```rust
//! use catalog_service::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
//!
//! let error = RepositoryError::not_found(RepositoryOperation::Delete, "Author", 42);
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert_eq!(error.entity_id, Some(42));
//! ```

use std::fmt;

use sqlx::error::ErrorKind as SqlxErrorKind;

/// SQLite primary result codes that signal contention rather than a bad statement
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CONSTRAINT: i32 = 19;
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;
const SQLITE_CONSTRAINT_TRIGGER: i32 = 1811;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Persisting a new entity
    Create,
    /// Reading a single entity by primary key
    GetById,
    /// Reading one page of entities
    List,
    /// Overwriting the mutable fields of an entity
    Update,
    /// Removing an entity
    Delete,
    /// Reading entities that reference a parent
    LoadRelated,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::GetById => write!(f, "get_by_id"),
            Self::List => write!(f, "list"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::LoadRelated => write!(f, "load_related"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// The targeted id does not exist
    NotFound,
    /// Storage rejected the write (foreign key, length or uniqueness rule)
    ConstraintViolation,
    /// Caller-supplied arguments are out of range
    InvalidArgument,
    /// Storage could not be reached or is contended; may succeed later
    StorageUnavailable,
    /// Any other storage failure
    DatabaseError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::StorageUnavailable => write!(f, "storage_unavailable"),
            Self::DatabaseError => write!(f, "database_error"),
        }
    }
}

/// Structured repository error with operation context
///
/// ```rust
/// use catalog_service::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::not_found(RepositoryOperation::Update, "Book", 9);
/// assert_eq!(
///     error.to_string(),
///     "Repository not_found error during update: Entity not found [Book: 9]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Book")
    pub entity_type: Option<String>,
    /// The id of the entity involved
    pub entity_id: Option<i64>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(
        operation: RepositoryOperation,
        entity_type: impl Into<String>,
        entity_id: i64,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::NotFound, "Entity not found")
            .with_entity(entity_type, entity_id)
    }

    /// Create an invalid argument error
    pub fn invalid_argument(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::InvalidArgument, message)
    }

    /// Create a constraint violation error
    pub fn constraint_violation(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    /// Create a storage unavailable error
    pub fn storage_unavailable(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::StorageUnavailable, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Classify a driver error raised while performing `operation`
    pub fn from_sqlx(operation: RepositoryOperation, err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match err {
            E::RowNotFound => Self::new(operation, RepositoryErrorKind::NotFound, "Row not found"),
            E::PoolTimedOut => {
                Self::storage_unavailable(operation, "Connection pool timed out")
            }
            E::PoolClosed => Self::storage_unavailable(operation, "Connection pool is closed"),
            E::WorkerCrashed => Self::storage_unavailable(operation, "Database worker crashed"),
            E::Io(e) => Self::storage_unavailable(operation, e.to_string()),
            E::Tls(e) => Self::storage_unavailable(operation, format!("TLS error: {}", e)),
            E::Database(db_err) => {
                let kind = match db_err.kind() {
                    SqlxErrorKind::UniqueViolation
                    | SqlxErrorKind::ForeignKeyViolation
                    | SqlxErrorKind::NotNullViolation
                    | SqlxErrorKind::CheckViolation => RepositoryErrorKind::ConstraintViolation,
                    _ if is_constraint(db_err.code().as_deref()) => {
                        RepositoryErrorKind::ConstraintViolation
                    }
                    _ if is_contention(db_err.code().as_deref()) => {
                        RepositoryErrorKind::StorageUnavailable
                    }
                    _ => RepositoryErrorKind::DatabaseError,
                };
                Self::new(operation, kind, db_err.message())
            }
            other => Self::database_error(operation, other.to_string()),
        }
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: i64) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id);
        self
    }

    /// Add only the entity type, for errors not tied to one row
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Replace the message, keeping kind and context
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    ///
    /// The repository never retries on its own; this is a hint for callers.
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, RepositoryErrorKind::StorageUnavailable)
    }
}

/// SQLite reports extended result codes; the low byte is the primary code
fn result_code(code: Option<&str>) -> Option<i32> {
    code.and_then(|c| c.parse::<i32>().ok())
}

fn is_contention(code: Option<&str>) -> bool {
    result_code(code)
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

fn is_constraint(code: Option<&str>) -> bool {
    result_code(code)
        .map(|c| c & 0xff == SQLITE_CONSTRAINT)
        .unwrap_or(false)
}

/// Whether a driver error is a foreign key failure
///
/// `ON DELETE RESTRICT` surfaces as `SQLITE_CONSTRAINT_TRIGGER` rather than
/// `SQLITE_CONSTRAINT_FOREIGNKEY`, which the driver does not map to
/// [`SqlxErrorKind::ForeignKeyViolation`].
pub(crate) fn is_foreign_key_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_foreign_key_violation()
                || matches!(
                    result_code(db_err.code().as_deref()),
                    Some(SQLITE_CONSTRAINT_FOREIGNKEY | SQLITE_CONSTRAINT_TRIGGER)
                )
        }
        _ => false,
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}
