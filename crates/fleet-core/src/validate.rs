//! # Field Validation
//!
//! The [`Validate`] trait for request DTOs and the [`Checker`] accumulator
//! used to implement it. A checker collects every failing field; `finish`
//! turns the collection into a [`DomainError::Validation`].

use crate::error::{DomainError, FieldError, FieldErrorCode};

/// Maximum length for `name`-like fields.
pub const MAX_NAME_LEN: usize = 255;
/// Maximum length for `code`-like fields.
pub const MAX_CODE_LEN: usize = 20;
/// Maximum length for free-text descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Request types that validate business rules beyond what serde checks.
pub trait Validate {
    /// Validate the value, returning every failing field.
    fn validate(&self) -> Result<(), DomainError>;
}

/// Accumulates field errors.
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    /// Start an empty checker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arbitrary error.
    pub fn push(&mut self, error: FieldError) -> &mut Self {
        self.errors.push(error);
        self
    }

    /// Non-blank string no longer than `max` characters.
    pub fn text(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(
                field,
                FieldErrorCode::Required,
                format!("{field} is required"),
            ));
        } else if value.chars().count() > max {
            self.errors.push(
                FieldError::new(
                    field,
                    FieldErrorCode::TooLong,
                    format!("{field} must not exceed {max} characters"),
                )
                .with_value(value),
            );
        }
        self
    }

    /// Optional string: blank is allowed, length is bounded.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.errors.push(FieldError::new(
                    field,
                    FieldErrorCode::TooLong,
                    format!("{field} must not exceed {max} characters"),
                ));
            }
        }
        self
    }

    /// Short identifier: letters, digits, `-` and `_`.
    pub fn code(&mut self, field: &str, value: &str) -> &mut Self {
        let before = self.errors.len();
        self.text(field, value, MAX_CODE_LEN);
        if self.errors.len() == before
            && !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.errors.push(
                FieldError::new(
                    field,
                    FieldErrorCode::InvalidFormat,
                    format!("{field} may only contain letters, digits, '-' and '_'"),
                )
                .with_value(value),
            );
        }
        self
    }

    /// Loose e-mail shape: `local@domain.tld`.
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            self.errors.push(
                FieldError::new(
                    field,
                    FieldErrorCode::InvalidFormat,
                    format!("{field} must be a valid email address"),
                )
                .with_value(value),
            );
        }
        self
    }

    /// Absolute `http` or `https` URL with a host.
    pub fn url(&mut self, field: &str, value: &str) -> &mut Self {
        let valid = match url::Url::parse(value) {
            Ok(parsed) => {
                matches!(parsed.scheme(), "http" | "https")
                    && parsed.host_str().is_some_and(|host| !host.is_empty())
            }
            Err(_) => false,
        };
        if !valid {
            self.errors.push(
                FieldError::new(
                    field,
                    FieldErrorCode::InvalidFormat,
                    format!("{field} must be an http(s) URL"),
                )
                .with_value(value),
            );
        }
        self
    }

    /// `#RRGGBB` color.
    pub fn hex_color(&mut self, field: &str, value: &str) -> &mut Self {
        let valid = value.len() == 7
            && value.starts_with('#')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            self.errors.push(
                FieldError::new(
                    field,
                    FieldErrorCode::InvalidFormat,
                    format!("{field} must be a #RRGGBB color"),
                )
                .with_value(value),
            );
        }
        self
    }

    /// Inclusive integer range.
    pub fn range_i64(&mut self, field: &str, value: i64, min: i64, max: i64) -> &mut Self {
        if value < min || value > max {
            self.errors.push(
                FieldError::new(
                    field,
                    FieldErrorCode::OutOfRange,
                    format!("{field} must be between {min} and {max}"),
                )
                .with_value(value),
            );
        }
        self
    }

    /// Inclusive float range.
    pub fn range_f64(&mut self, field: &str, value: f64, min: f64, max: f64) -> &mut Self {
        if !(min..=max).contains(&value) {
            self.errors.push(
                FieldError::new(
                    field,
                    FieldErrorCode::OutOfRange,
                    format!("{field} must be between {min} and {max}"),
                )
                .with_value(value),
            );
        }
        self
    }

    /// Foreign key shape: a positive identifier.
    pub fn id(&mut self, field: &str, value: i64) -> &mut Self {
        if value < 1 {
            self.errors.push(
                FieldError::new(
                    field,
                    FieldErrorCode::OutOfRange,
                    format!("{field} must be a positive identifier"),
                )
                .with_value(value),
            );
        }
        self
    }

    /// Collected errors so far.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Finish the check.
    pub fn finish(&mut self) -> Result<(), DomainError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}
