//! # Error Hierarchy
//!
//! Structured domain errors built with `thiserror`. Field-level problems are
//! carried as [`FieldError`] lists so the API layer can return every failing
//! field in one response instead of stopping at the first.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::seat_layout::LayoutError;

/// Machine-readable classification of a field-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldErrorCode {
    /// A required value is missing or blank.
    Required,
    /// A string exceeds its maximum length.
    TooLong,
    /// A value does not match the expected format.
    InvalidFormat,
    /// A numeric value is outside its permitted range.
    OutOfRange,
    /// A value is not one of the permitted options.
    InvalidOption,
    /// Another non-deleted record already holds this value.
    Duplicate,
    /// A referenced record does not exist or is deleted.
    NotFound,
    /// The field is not known or not usable in this position.
    UnknownField,
}

impl FieldErrorCode {
    /// Return the wire representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::TooLong => "TOO_LONG",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::InvalidOption => "INVALID_OPTION",
            Self::Duplicate => "DUPLICATE",
            Self::NotFound => "NOT_FOUND",
            Self::UnknownField => "UNKNOWN_FIELD",
        }
    }
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// Field name as it appears in the JSON payload (camelCase).
    pub field: String,
    /// Error classification.
    pub code: FieldErrorCode,
    /// Human-readable message.
    pub message: String,
    /// The offending value, when it is safe and useful to echo back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl FieldError {
    /// Build a field error without an echoed value.
    pub fn new(field: impl Into<String>, code: FieldErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
            value: None,
        }
    }

    /// Attach the offending value.
    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Duplicate-value error for a unique field.
    pub fn duplicate(field: &str, value: serde_json::Value) -> Self {
        Self::new(
            field,
            FieldErrorCode::Duplicate,
            format!("{field} already exists"),
        )
        .with_value(value)
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.code.as_str(), self.message)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level domain error.
#[derive(Error, Debug)]
pub enum DomainError {
    /// The addressed record does not exist (or is soft-deleted).
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource path segment, e.g. `countries`.
        resource: &'static str,
        /// Requested identifier.
        id: i64,
    },

    /// One or more fields failed validation.
    #[error("{}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// One or more unique fields collide with an existing record.
    #[error("{}", summarize(.0))]
    Duplicate(Vec<FieldError>),

    /// A seat layout edit violated the grid rules.
    #[error("invalid seat layout: {0}")]
    Layout(#[from] LayoutError),
}

impl DomainError {
    /// Shorthand for a validation error on a single field.
    pub fn field(field: &str, code: FieldErrorCode, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, code, message)])
    }

    /// Field errors carried by this error, if any.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Validation(errors) | Self::Duplicate(errors) => Some(errors),
            _ => None,
        }
    }
}
