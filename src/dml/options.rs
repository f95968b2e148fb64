//! Per-call write options.
//!
//! [`WriteOptions`] is the explicit context passed to every persistence
//! call: TTL, write timestamp, consistency, timeout, conditionals and the
//! connection override. Nothing is stashed on the record between calls.

use crate::error::CqlError;
use crate::executor::Consistency;
use crate::model::TableSchema;
use crate::statement::{Operator, Predicate};
use crate::value::Value;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

/// Write timestamp source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTimestamp {
    /// Microseconds since the epoch
    Micros(i64),
    /// A wall-clock instant
    At(DateTime<Utc>),
    /// Offset from the moment the statement is compiled
    Offset(ChronoDuration),
}

impl WriteTimestamp {
    /// Resolve to microseconds since the epoch
    #[must_use]
    pub fn to_micros(self) -> i64 {
        match self {
            WriteTimestamp::Micros(us) => us,
            WriteTimestamp::At(at) => at.timestamp_micros(),
            // saturate at the representable range
            WriteTimestamp::Offset(delta) => Utc::now()
                .checked_add_signed(delta)
                .unwrap_or(if delta < ChronoDuration::zero() {
                    DateTime::<Utc>::MIN_UTC
                } else {
                    DateTime::<Utc>::MAX_UTC
                })
                .timestamp_micros(),
        }
    }
}

impl From<DateTime<Utc>> for WriteTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        WriteTimestamp::At(at)
    }
}

impl From<ChronoDuration> for WriteTimestamp {
    fn from(delta: ChronoDuration) -> Self {
        WriteTimestamp::Offset(delta)
    }
}

impl From<i64> for WriteTimestamp {
    fn from(us: i64) -> Self {
        WriteTimestamp::Micros(us)
    }
}

/// Conditional predicate keyed by model column name
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Operator,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    pub ttl: Option<i32>,
    pub timestamp: Option<WriteTimestamp>,
    pub consistency: Option<Consistency>,
    pub timeout: Option<Duration>,
    pub if_not_exists: bool,
    pub if_exists: bool,
    pub conditions: Vec<Condition>,
    /// Connection override; not allowed together with a batch
    pub connection: Option<String>,
}

impl WriteOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ttl(mut self, seconds: i32) -> Self {
        self.ttl = Some(seconds);
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: impl Into<WriteTimestamp>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    #[must_use]
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    #[must_use]
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Add an `IF column = value` condition
    #[must_use]
    pub fn iff(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.iff_op(column, Operator::Eq, value)
    }

    #[must_use]
    pub fn iff_op(mut self, column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Run on the named connection instead of the model's
    #[must_use]
    pub fn using(mut self, connection: impl Into<String>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.if_not_exists || self.if_exists || !self.conditions.is_empty()
    }

    pub(crate) fn timestamp_micros(&self) -> Option<i64> {
        self.timestamp.map(WriteTimestamp::to_micros)
    }

    /// Resolve conditions against `schema` into IF predicates on stored
    /// column names.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for an unknown column.
    pub(crate) fn conditionals(&self, schema: &TableSchema) -> Result<Vec<Predicate>, CqlError> {
        self.conditions
            .iter()
            .map(|c| {
                let col = schema.column_or_err(&c.column)?;
                Ok(Predicate::new(col.db_field_name(), c.op, c.value.clone()))
            })
            .collect()
    }
}
