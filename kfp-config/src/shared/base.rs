use std::fmt;
use std::slice;

use thiserror::Error;

/// A single schema violation found while parsing a configuration document.
///
/// Every variant carries the dotted path of the offending field, e.g.
/// `run_config.retry_policy.node3.num_retries`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent or null.
    #[error("`{field}` is required")]
    MissingField { field: String },

    /// A field holds a value that cannot be coerced to its declared type.
    #[error("`{field}` must be {expected}, found {found}")]
    InvalidType {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// A field has the right type but an unacceptable value.
    #[error("`{field}` is invalid: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    /// Returns the dotted path of the field this violation refers to.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::InvalidType { field, .. }
            | Self::InvalidValue { field, .. } => field,
        }
    }
}

/// Every violation found while parsing one configuration document.
///
/// Parsing never stops at the first problem, so a user fixing their document sees the whole
/// list at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Returns `true` if any violation refers to exactly `field`.
    pub fn contains_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field() == field)
    }

    pub(crate) fn missing(&mut self, field: String) {
        self.push(ValidationError::MissingField { field });
    }

    pub(crate) fn invalid_type(&mut self, field: String, expected: &'static str, found: String) {
        self.push(ValidationError::InvalidType {
            field,
            expected,
            found,
        });
    }

    pub(crate) fn invalid_value(&mut self, field: String, reason: impl Into<String>) {
        self.push(ValidationError::InvalidValue {
            field,
            reason: reason.into(),
        });
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "invalid configuration"),
            1 => write!(f, "invalid configuration: {}", self.errors[0]),
            count => {
                write!(f, "invalid configuration ({count} errors):")?;
                for error in &self.errors {
                    write!(f, "\n  - {error}")?;
                }

                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_every_violation() {
        let mut errors = ValidationErrors::default();
        errors.missing("host".to_string());
        errors.missing("run_config.image".to_string());

        let message = errors.to_string();

        assert!(message.starts_with("invalid configuration (2 errors):"));
        assert!(message.contains("`host` is required"));
        assert!(message.contains("`run_config.image` is required"));
    }

    #[test]
    fn test_display_single_violation() {
        let mut errors = ValidationErrors::default();
        errors.invalid_type(
            "run_config.ttl".to_string(),
            "an integer",
            "\"soon\"".to_string(),
        );

        assert_eq!(
            errors.to_string(),
            "invalid configuration: `run_config.ttl` must be an integer, found \"soon\""
        );
    }

    #[test]
    fn test_contains_field() {
        let mut errors = ValidationErrors::default();
        errors.invalid_value("host".to_string(), "must not be empty");

        assert!(errors.contains_field("host"));
        assert!(!errors.contains_field("run_config"));
        assert_eq!(errors.len(), 1);
    }
}
