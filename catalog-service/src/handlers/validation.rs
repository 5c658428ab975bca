//! Field validation for request bodies
//!
//! Messages are user-facing and keyed by the camelCase wire field name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiOperation};

/// Longest accepted name or title, in characters
pub const MAX_NAME_LENGTH: usize = 50;

/// A single failed rule on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    /// Machine-readable rule id such as `REQUIRED` or `TOO_LONG`
    pub code: String,
    pub message: String,
}

/// Collects field errors for one request body
#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, Vec<FieldError>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, code: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(FieldError {
                field: field.to_string(),
                code: code.to_string(),
                message: message.into(),
            });
    }

    /// Non-blank text of at most [`MAX_NAME_LENGTH`] characters
    ///
    /// `label` is the capitalised field name used in messages.
    pub fn text(&mut self, field: &str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "REQUIRED", format!("{} is required", label));
        } else if value.chars().count() > MAX_NAME_LENGTH {
            self.add(
                field,
                "TOO_LONG",
                format!("{} maximum length is {}", label, MAX_NAME_LENGTH),
            );
        }
    }

    /// Strictly positive identifier
    pub fn id(&mut self, field: &str, label: &str, value: i64) {
        if value <= 0 {
            self.add(field, "INVALID_ID", format!("Invalid {}", label));
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// `Ok(value)` when nothing failed, otherwise a validation [`ApiError`]
    pub fn finish<T>(self, operation: ApiOperation, value: T) -> Result<T, ApiError> {
        if self.has_errors() {
            Err(ApiError::validation_failed(operation, self.errors))
        } else {
            Ok(value)
        }
    }
}
