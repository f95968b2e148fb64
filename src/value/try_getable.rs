//! `TryGetable` for error-aware value extraction.
//!
//! Unlike [`ValueType::from_value`], extraction through `TryGetable`
//! distinguishes a null cell from a cell holding the wrong type.

use crate::value::{Value, ValueType};

/// Error type for value extraction failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExtractionError {
    /// The value is null
    NullValue,
    /// The value type doesn't match the expected type
    TypeMismatch {
        expected: String,
        actual: String,
    },
}

impl std::fmt::Display for ValueExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueExtractionError::NullValue => write!(f, "Value is null"),
            ValueExtractionError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for ValueExtractionError {}

/// Safe value extraction
///
/// ```rust
/// use cqlguard::{TryGetable, Value, ValueExtractionError};
///
/// let result: Result<i32, ValueExtractionError> = TryGetable::try_get(Value::Int(42));
/// assert_eq!(result, Ok(42));
///
/// let result: Result<i32, ValueExtractionError> = TryGetable::try_get(Value::Null);
/// assert!(matches!(result, Err(ValueExtractionError::NullValue)));
/// ```
pub trait TryGetable: ValueType {
    /// Extract a non-null value of this type.
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        if value.is_null() {
            return Err(ValueExtractionError::NullValue);
        }
        let actual = value.type_name();
        Self::from_value(value).ok_or_else(|| ValueExtractionError::TypeMismatch {
            expected: std::any::type_name::<Self>().to_string(),
            actual: actual.to_string(),
        })
    }

    /// Extract a value, mapping null to `None`.
    fn try_get_opt(value: Value) -> Result<Option<Self>, ValueExtractionError> {
        match Self::try_get(value) {
            Ok(v) => Ok(Some(v)),
            Err(ValueExtractionError::NullValue) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<T: ValueType> TryGetable for T {}
