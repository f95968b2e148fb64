//! Column descriptors.
//!
//! A [`ColumnDef`] names a column, its CQL type, its role in the primary key
//! (or static / regular), and its default-value policy. Columns are declared
//! through [`TableSchemaBuilder`](crate::TableSchemaBuilder).

use crate::error::CqlError;
use crate::value::Value;
use std::fmt;

/// CQL column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Ascii,
    Text,
    Int,
    BigInt,
    Counter,
    Boolean,
    Float,
    Double,
    Uuid,
    TimeUuid,
    Timestamp,
    Blob,
    List(Box<ColumnType>),
    Set(Box<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
}

impl ColumnType {
    #[must_use]
    pub fn list(inner: ColumnType) -> Self {
        ColumnType::List(Box::new(inner))
    }

    #[must_use]
    pub fn set(inner: ColumnType) -> Self {
        ColumnType::Set(Box::new(inner))
    }

    #[must_use]
    pub fn map(key: ColumnType, value: ColumnType) -> Self {
        ColumnType::Map(Box::new(key), Box::new(value))
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, ColumnType::List(_) | ColumnType::Set(_) | ColumnType::Map(..))
    }

    /// Null-equivalent test: `Null`, or an empty collection for collection types
    #[must_use]
    pub fn is_null(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::List(v) | Value::Set(v) if self.is_collection() => v.is_empty(),
            Value::Map(v) if self.is_collection() => v.is_empty(),
            _ => false,
        }
    }

    /// Type check a non-null value bound for the column `name`.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` when the value does not fit the type.
    pub fn check(&self, name: &str, value: Value) -> Result<Value, CqlError> {
        self.coerce(value).map_err(|bad| {
            CqlError::Validation(format!("{name} - {} value {bad} is not a valid {self}", bad.type_name()))
        })
    }

    /// Type check with the coercions the mapper applies before persistence:
    /// int widens to bigint/counter, float widens to double, a list is
    /// accepted for a set column, and set members are de-duplicated.
    fn coerce(&self, value: Value) -> Result<Value, Value> {
        match (self, value) {
            (ColumnType::Ascii, Value::Text(s)) if s.is_ascii() => Ok(Value::Text(s)),
            (ColumnType::Text, v @ Value::Text(_)) => Ok(v),
            (ColumnType::Int, v @ Value::Int(_)) => Ok(v),
            (ColumnType::BigInt | ColumnType::Counter, Value::Int(i)) => Ok(Value::BigInt(i64::from(i))),
            (ColumnType::BigInt | ColumnType::Counter, v @ Value::BigInt(_)) => Ok(v),
            (ColumnType::Boolean, v @ Value::Boolean(_)) => Ok(v),
            (ColumnType::Float, v @ Value::Float(_)) => Ok(v),
            (ColumnType::Double, Value::Float(f)) => Ok(Value::Double(f64::from(f))),
            (ColumnType::Double, v @ Value::Double(_)) => Ok(v),
            (ColumnType::Uuid, v @ Value::Uuid(_)) => Ok(v),
            (ColumnType::TimeUuid, Value::Uuid(u)) if u.get_version_num() == 1 => Ok(Value::Uuid(u)),
            (ColumnType::Timestamp, v @ Value::Timestamp(_)) => Ok(v),
            (ColumnType::Blob, v @ Value::Blob(_)) => Ok(v),
            (ColumnType::List(inner), Value::List(items)) => {
                coerce_items(inner, items).map(Value::List).map_err(Value::List)
            }
            (ColumnType::Set(inner), Value::Set(items) | Value::List(items)) => {
                let items = coerce_items(inner, items).map_err(Value::Set)?;
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Ok(Value::Set(unique))
            }
            (ColumnType::Map(kt, vt), Value::Map(entries)) => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    if k.is_null() || v.is_null() {
                        return Err(Value::Map(vec![(k, v)]));
                    }
                    let k = kt.coerce(k)?;
                    let v = vt.coerce(v)?;
                    out.push((k, v));
                }
                Ok(Value::Map(out))
            }
            (_, other) => Err(other),
        }
    }
}

fn coerce_items(inner: &ColumnType, items: Vec<Value>) -> Result<Vec<Value>, Vec<Value>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            return Err(vec![item]);
        }
        match inner.coerce(item) {
            Ok(v) => out.push(v),
            Err(bad) => return Err(vec![bad]),
        }
    }
    Ok(out)
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Ascii => write!(f, "ascii"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Int => write!(f, "int"),
            ColumnType::BigInt => write!(f, "bigint"),
            ColumnType::Counter => write!(f, "counter"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Double => write!(f, "double"),
            ColumnType::Uuid => write!(f, "uuid"),
            ColumnType::TimeUuid => write!(f, "timeuuid"),
            ColumnType::Timestamp => write!(f, "timestamp"),
            ColumnType::Blob => write!(f, "blob"),
            ColumnType::List(t) => write!(f, "list<{t}>"),
            ColumnType::Set(t) => write!(f, "set<{t}>"),
            ColumnType::Map(k, v) => write!(f, "map<{k}, {v}>"),
        }
    }
}

/// Role of a column in its table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    PartitionKey,
    ClusteringKey,
    Static,
    Regular,
}

/// Default-value policy
#[derive(Debug, Clone)]
pub enum DefaultValue {
    Value(Value),
    /// Called for every new record, e.g. to mint a fresh uuid
    Generate(fn() -> Value),
}

/// Column descriptor
#[derive(Debug, Clone)]
pub struct ColumnDef {
    name: String,
    column_type: ColumnType,
    role: ColumnRole,
    db_field: Option<String>,
    required: bool,
    default: Option<DefaultValue>,
}

impl ColumnDef {
    /// A regular column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            role: ColumnRole::Regular,
            db_field: None,
            required: false,
            default: None,
        }
    }

    #[must_use]
    pub fn partition_key(mut self) -> Self {
        self.role = ColumnRole::PartitionKey;
        self
    }

    #[must_use]
    pub fn clustering_key(mut self) -> Self {
        self.role = ColumnRole::ClusteringKey;
        self
    }

    #[must_use]
    pub fn static_column(mut self) -> Self {
        self.role = ColumnRole::Static;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Store the column under a different name in the table
    #[must_use]
    pub fn db_field(mut self, name: impl Into<String>) -> Self {
        self.db_field = Some(name.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    #[must_use]
    pub fn default_with(mut self, generate: fn() -> Value) -> Self {
        self.default = Some(DefaultValue::Generate(generate));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used in statements and result rows
    #[must_use]
    pub fn db_field_name(&self) -> &str {
        self.db_field.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    #[must_use]
    pub fn role(&self) -> ColumnRole {
        self.role
    }

    #[must_use]
    pub fn is_partition_key(&self) -> bool {
        self.role == ColumnRole::PartitionKey
    }

    #[must_use]
    pub fn is_clustering_key(&self) -> bool {
        self.role == ColumnRole::ClusteringKey
    }

    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.is_partition_key() || self.is_clustering_key()
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.role == ColumnRole::Static
    }

    #[must_use]
    pub fn is_counter(&self) -> bool {
        self.column_type == ColumnType::Counter
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// The default for a new record, or `Value::Null`
    #[must_use]
    pub fn get_default(&self) -> Value {
        match &self.default {
            Some(DefaultValue::Value(v)) => v.clone(),
            Some(DefaultValue::Generate(f)) => f(),
            None => Value::Null,
        }
    }

    #[must_use]
    pub fn is_null(&self, value: &Value) -> bool {
        self.column_type.is_null(value)
    }

    /// Validate and coerce a value bound for this column.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for a null in a required column or a
    /// value of the wrong type.
    pub fn validate(&self, value: Value) -> Result<Value, CqlError> {
        if value.is_null() {
            if self.required {
                return Err(CqlError::Validation(format!("{} - None values are not allowed", self.name)));
            }
            return Ok(value);
        }
        self.column_type.check(&self.name, value)
    }
}
