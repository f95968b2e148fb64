//! Scripted driver for tests.
//!
//! [`MockDriver`] implements [`CqlDriver`] without a cluster. Every request
//! is recorded; results come from a queue of scripted outcomes, then from an
//! optional handler closure, then default to an empty result.

use crate::executor::{CqlDriver, DriverError, RawResult, Request, Row};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

type Handler = Box<dyn Fn(&Request) -> Result<RawResult, DriverError> + Send + Sync>;

static LIMIT: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"LIMIT (\d+)"));

#[derive(Default)]
pub struct MockDriver {
    requests: Mutex<Vec<Request>>,
    scripted: Mutex<VecDeque<Result<RawResult, DriverError>>>,
    handler: Option<Handler>,
}

impl MockDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests with `handler` once the scripted queue is empty
    pub fn with_handler(handler: impl Fn(&Request) -> Result<RawResult, DriverError> + Send + Sync + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::default()
        }
    }

    /// Serve SELECTs from `rows`, honoring fetch size, paging state and LIMIT
    #[must_use]
    pub fn paged(rows: Vec<Row>) -> Self {
        Self::with_handler(move |request| Ok(page_of(&rows, request)))
    }

    pub fn push_result(&self, result: Result<RawResult, DriverError>) {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.push_result(Ok(RawResult::with_rows(rows)));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.push_result(Err(DriverError::Query(message.into())));
    }

    /// Every request seen so far, in arrival order
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// CQL text of every request seen so far
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.cql).collect()
    }
}

impl CqlDriver for MockDriver {
    fn execute(&self, request: &Request) -> Result<RawResult, DriverError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match (scripted, &self.handler) {
            (Some(result), _) => result,
            (None, Some(handler)) => handler(request),
            (None, None) => Ok(RawResult::default()),
        }
    }
}

/// Build a result row from column/value pairs
#[must_use]
pub fn row(cells: &[(&str, Value)]) -> Row {
    cells.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

fn page_of(rows: &[Row], request: &Request) -> RawResult {
    if !request.cql.starts_with("SELECT") {
        return RawResult::default();
    }
    let limit = LIMIT
        .as_ref()
        .ok()
        .and_then(|re| re.captures(&request.cql))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok());
    let total = limit.map_or(rows.len(), |l| l.min(rows.len()));

    let offset = request
        .paging_state
        .as_deref()
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map_or(0, |bytes| u64::from_be_bytes(bytes) as usize);
    let size = request
        .fetch_size
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(total);
    let end = (offset + size).min(total);

    RawResult {
        rows: rows[offset.min(end)..end].to_vec(),
        paging_state: (end < total).then(|| (end as u64).to_be_bytes().to_vec()),
        applied: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: i32) -> Vec<Row> {
        (0..n).map(|i| row(&[("id", Value::Int(i))])).collect()
    }

    #[test]
    fn test_paged_table_walks_cursor() {
        let driver = MockDriver::paged(numbered(25));
        let mut request = Request::new("SELECT * FROM ks.t", vec![]);
        request.fetch_size = Some(10);

        let first = driver.execute(&request).unwrap();
        assert_eq!(first.rows.len(), 10);
        request.paging_state = first.paging_state;
        let second = driver.execute(&request).unwrap();
        request.paging_state = second.paging_state;
        let third = driver.execute(&request).unwrap();
        assert_eq!(third.rows.len(), 5);
        assert!(third.paging_state.is_none());
    }

    #[test]
    fn test_paged_table_honors_limit() {
        let driver = MockDriver::paged(numbered(25));
        let request = Request::new("SELECT * FROM ks.t LIMIT 7", vec![]);
        let result = driver.execute(&request).unwrap();
        assert_eq!(result.rows.len(), 7);
        assert!(result.paging_state.is_none());
    }

    #[test]
    fn test_scripted_results_come_first() {
        let driver = MockDriver::new();
        driver.push_error("boom");
        assert!(driver.execute(&Request::new("X", vec![])).is_err());
        assert!(driver.execute(&Request::new("Y", vec![])).is_ok());
        assert_eq!(driver.statements(), vec!["X".to_string(), "Y".to_string()]);
    }
}
