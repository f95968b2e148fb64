//! CQL cell values and the `ValueType` conversion trait.
//!
//! [`Value`] is the in-memory representation of a single CQL cell. Every
//! column slot on a [`Record`](crate::Record) holds one, and every bind
//! parameter sent to the driver is one.
//!
//! ## Usage
//!
//! ```rust
//! use cqlguard::{Value, ValueType};
//!
//! let value: Value = ValueType::into_value(42i32);
//! assert_eq!(value, Value::Int(42));
//!
//! let back: Option<i32> = ValueType::from_value(value);
//! assert_eq!(back, Some(42));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single CQL value.
///
/// `Null` is the null-equivalent for scalar columns. For collection columns
/// an empty collection is also treated as null (see
/// [`ColumnType::is_null`](crate::ColumnType::is_null)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
    List(Vec<Value>),
    /// Set contents; kept in insertion order, de-duplicated by validation
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Returns `true` for `Value::Null`
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type label used in validation messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::Blob(_) => "blob",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    /// Integer view used for counter deltas; `Null` counts as zero
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Null => Some(0),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Value::List(items) | Value::Set(items) => {
                let (open, close) = if matches!(self, Value::List(_)) { ('[', ']') } else { ('{', '}') };
                write!(f, "{open}")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Trait for mapping Rust types to their corresponding [`Value`] variant.
///
/// `Option<T>` maps `None` to [`Value::Null`].
pub trait ValueType: Sized {
    /// Convert this value into a [`Value`].
    fn into_value(self) -> Value;

    /// Convert a [`Value`] into this type, if the variant matches.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_value_type {
    ($ty:ty, $variant:ident) => {
        impl ValueType for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_value_type!(bool, Boolean);
impl_value_type!(i32, Int);
impl_value_type!(f32, Float);
impl_value_type!(f64, Double);
impl_value_type!(String, Text);
impl_value_type!(Uuid, Uuid);
impl_value_type!(DateTime<Utc>, Timestamp);
impl_value_type!(Vec<u8>, Blob);

// bigint reads also accept int cells, matching the widening done by validation
impl ValueType for i64 {
    fn into_value(self) -> Value {
        Value::BigInt(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::BigInt(v) => Some(v),
            Value::Int(v) => Some(i64::from(v)),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: ValueType> ValueType for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ValueType> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.into_value()
    }
}
