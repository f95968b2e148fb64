//! Error taxonomy for cqlguard operations.
//!
//! Validation, configuration and model errors are returned before any
//! statement is handed to a worker. Driver and conditional errors only ever
//! come back through the awaited result.

use crate::executor::{DriverError, Row};
use std::fmt;

/// Error type for mapper operations
#[derive(Debug, Clone, PartialEq)]
pub enum CqlError {
    /// Unknown column, primary key mutation, or a value that fails validation
    Validation(String),
    /// Connection misuse: unknown connection name, or a batch spanning two connections
    Configuration(String),
    /// A single-row read matched nothing
    DoesNotExist(String),
    /// A single-row read matched more than one row
    MultipleObjectsReturned(String),
    /// A conditional write came back with `[applied] = false`
    ConditionalNotApplied {
        /// Row state reported by the server, forwarded verbatim
        existing: Option<Row>,
    },
    /// Schema or polymorphic modeling error
    Model(String),
    /// Failure surfaced by the driver call
    Driver(DriverError),
}

impl CqlError {
    /// `true` for [`CqlError::DoesNotExist`]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CqlError::DoesNotExist(_))
    }

    /// `true` for [`CqlError::MultipleObjectsReturned`]
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        matches!(self, CqlError::MultipleObjectsReturned(_))
    }
}

impl fmt::Display for CqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CqlError::Validation(s) => write!(f, "Validation error: {s}"),
            CqlError::Configuration(s) => write!(f, "Configuration error: {s}"),
            CqlError::DoesNotExist(s) => write!(f, "Does not exist: {s}"),
            CqlError::MultipleObjectsReturned(s) => write!(f, "Multiple objects returned: {s}"),
            CqlError::ConditionalNotApplied { existing } => match existing {
                Some(row) => {
                    let shown = serde_json::to_string(row).unwrap_or_else(|_| format!("{row:?}"));
                    write!(f, "Conditional statement not applied, existing: {shown}")
                }
                None => write!(f, "Conditional statement not applied"),
            },
            CqlError::Model(s) => write!(f, "Model error: {s}"),
            CqlError::Driver(e) => write!(f, "Driver error: {e}"),
        }
    }
}

impl std::error::Error for CqlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CqlError::Driver(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DriverError> for CqlError {
    fn from(err: DriverError) -> Self {
        CqlError::Driver(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_not_found_and_multiple_are_distinguishable() {
        let nf = CqlError::DoesNotExist("users".into());
        let mu = CqlError::MultipleObjectsReturned("users".into());
        assert!(nf.is_not_found() && !nf.is_multiple());
        assert!(mu.is_multiple() && !mu.is_not_found());
    }

    #[test]
    fn test_conditional_display_includes_existing_row() {
        let mut row = Row::new();
        row.insert("username".into(), Value::from("taken"));
        let err = CqlError::ConditionalNotApplied { existing: Some(row) };
        assert!(err.to_string().contains("taken"));
    }

    #[test]
    fn test_driver_error_source() {
        use std::error::Error;
        let err = CqlError::from(DriverError::Query("x".into()));
        assert!(err.source().is_some());
    }
}
