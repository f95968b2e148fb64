//! Driver seam.
//!
//! Provides the `CqlDriver` trait that abstracts the blocking CQL driver, plus
//! the request/result types that cross it. The driver is consumed as a
//! capability: connection pooling, retries, consistency negotiation and
//! routing all belong to the implementation behind this trait.
//!
//! Calls into a `CqlDriver` block the calling thread. They are never made
//! from the awaiting task; [`Connection`](crate::Connection) hands them to
//! worker threads and resolves a future with the outcome.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// One result row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// CQL consistency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    LocalOne,
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::Serial => "SERIAL",
            Consistency::LocalSerial => "LOCAL_SERIAL",
            Consistency::LocalOne => "LOCAL_ONE",
        };
        write!(f, "{name}")
    }
}

/// A rendered statement ready for the driver.
///
/// Parameters bind positionally to the named markers `:p0`, `:p1`, ... in
/// `cql`; `params[i]` is the value for `:p{i}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    pub cql: String,
    pub params: Vec<Value>,
    pub consistency: Option<Consistency>,
    /// `None` leaves the driver's own default in place
    pub timeout: Option<Duration>,
    pub fetch_size: Option<i32>,
    /// Opaque server cursor from the previous page
    pub paging_state: Option<Vec<u8>>,
    /// Best-effort routing hint
    pub routing_key: Option<Vec<u8>>,
    pub keyspace: Option<String>,
}

impl Request {
    /// Create a request for a CQL string with its parameters
    pub fn new(cql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            cql: cql.into(),
            params,
            ..Self::default()
        }
    }
}

/// Raw outcome of one driver round trip
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResult {
    /// Rows of the current page
    pub rows: Vec<Row>,
    /// Cursor for the next page; `None` when the server has no more
    pub paging_state: Option<Vec<u8>>,
    /// `[applied]` flag of a conditional statement
    pub applied: Option<bool>,
}

impl RawResult {
    /// A result carrying just rows and no further pages
    #[must_use]
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Result of a conditional statement
    #[must_use]
    pub fn applied(applied: bool, existing: Option<Row>) -> Self {
        Self {
            rows: existing.into_iter().collect(),
            paging_state: None,
            applied: Some(applied),
        }
    }
}

/// Error surfaced by the driver or by the worker running it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The driver reported a failure
    Query(String),
    /// The driver call panicked on the worker thread
    Panicked(String),
    /// The worker pool is gone or dropped the request
    WorkerUnavailable(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Query(s) => write!(f, "Query error: {s}"),
            DriverError::Panicked(s) => write!(f, "Driver panicked: {s}"),
            DriverError::WorkerUnavailable(s) => write!(f, "Worker unavailable: {s}"),
        }
    }
}

impl std::error::Error for DriverError {}

/// Trait for the blocking CQL driver
///
/// Implementations must be thread-safe: a [`Connection`](crate::Connection)
/// shares one driver across all of its worker threads.
///
/// # Examples
///
/// ```no_run
/// use cqlguard::{CqlDriver, DriverError, RawResult, Request};
///
/// struct Noop;
///
/// impl CqlDriver for Noop {
///     fn execute(&self, _request: &Request) -> Result<RawResult, DriverError> {
///         Ok(RawResult::default())
///     }
/// }
/// ```
pub trait CqlDriver: Send + Sync {
    /// Execute one statement, blocking until the driver answers.
    ///
    /// # Errors
    ///
    /// Returns `DriverError` if the driver call fails.
    fn execute(&self, request: &Request) -> Result<RawResult, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Query("timeout".to_string());
        assert_eq!(err.to_string(), "Query error: timeout");
        let err = DriverError::Panicked("boom".to_string());
        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn test_consistency_deserializes_from_config_names() {
        let c: Consistency = serde_json::from_str("\"LOCAL_QUORUM\"").unwrap();
        assert_eq!(c, Consistency::LocalQuorum);
        assert_eq!(c.to_string(), "LOCAL_QUORUM");
    }

    #[test]
    fn test_applied_result_carries_existing_row() {
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from("a"));
        let res = RawResult::applied(false, Some(row.clone()));
        assert_eq!(res.applied, Some(false));
        assert_eq!(res.rows, vec![row]);
    }
}
