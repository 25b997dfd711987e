//! Validated input values.
//!
//! Values that cross from a form into an API request are parsed once into a
//! value object so the request builders never see raw, unchecked strings.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by value: two instances holding
/// the same data are interchangeable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A syntactically plausible email address (trimmed, lowercased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse user input.
    ///
    /// Only the shape is checked (one `@`, non-empty local part, dotted
    /// domain); deliverability is the server's concern.
    pub fn parse(input: &str) -> ValidationResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::missing("email"));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(ValidationError::malformed("email", "missing '@'"));
        };
        if local.is_empty() || domain.contains('@') {
            return Err(ValidationError::malformed("email", "invalid address"));
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(ValidationError::malformed("email", "invalid domain"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::malformed("email", "contains whitespace"));
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the `@` (used as a display-name fallback).
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl ValueObject for EmailAddress {}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A password chosen during a reset. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    pub fn parse(input: &str) -> ValidationResult<Self> {
        if input.trim().is_empty() {
            return Err(ValidationError::missing("password"));
        }
        if input.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::malformed(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        Ok(Self(input.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl ValueObject for NewPassword {}

impl core::fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("NewPassword(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let email = EmailAddress::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert_eq!(email.local_part(), "alice");
    }

    #[test]
    fn email_rejects_bad_shapes() {
        assert_eq!(EmailAddress::parse("   "), Err(ValidationError::missing("email")));
        assert!(EmailAddress::parse("invalid-email").is_err());
        assert!(EmailAddress::parse("@example.com").is_err());
        assert!(EmailAddress::parse("a@b@c.com").is_err());
        assert!(EmailAddress::parse("a@localhost").is_err());
        assert!(EmailAddress::parse("a b@c.com").is_err());
    }

    #[test]
    fn short_password_rejected() {
        assert!(NewPassword::parse("short").is_err());
        assert!(NewPassword::parse("").is_err());
        assert!(NewPassword::parse("long enough").is_ok());
    }

    #[test]
    fn password_debug_is_redacted() {
        let pw = NewPassword::parse("hunter2hunter2").unwrap();
        assert_eq!(format!("{pw:?}"), "NewPassword(***)");
    }
}
