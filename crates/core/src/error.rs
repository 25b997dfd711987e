//! Input validation error model.

use thiserror::Error;

/// Result type used for local input validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Local validation failure.
///
/// Raised before any network call is made: a form field was missing or
/// malformed. Remote failures belong to the client crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty (after trimming).
    #[error("{0} is required")]
    Missing(&'static str),

    /// A field was present but not acceptable.
    #[error("{field} is invalid: {reason}")]
    Malformed { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self::Missing(field)
    }

    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field (useful for inline form messages).
    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing(field) => field,
            Self::Malformed { field, .. } => field,
        }
    }
}
