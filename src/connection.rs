//! Connection Module
//!
//! A [`Connection`] is a named blocking driver plus the worker pool that runs
//! it. [`Connections`] is the registry entities resolve their connection
//! from: by explicit name, by the schema's connection, or the default.
//!
//! `Connection::execute_async` is the async bridge: the request is queued to
//! a worker thread, the awaiting task yields, and the result comes back
//! through a oneshot channel. The cooperative scheduler's thread never makes
//! a driver call.

use crate::error::CqlError;
use crate::executor::{Consistency, CqlDriver, RawResult, Request, Row};
use crate::pool::{SessionConfig, WorkerPool};
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "tracing")]
use tracing::Instrument;

/// Result of an awaited statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    raw: RawResult,
}

impl ResultSet {
    #[must_use]
    pub fn new(raw: RawResult) -> Self {
        Self { raw }
    }

    /// Rows of this page
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.raw.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.raw.rows
    }

    /// First row, if any
    #[must_use]
    pub fn one(&self) -> Option<&Row> {
        self.raw.rows.first()
    }

    /// Cursor for the next page; `None` when exhausted
    #[must_use]
    pub fn paging_state(&self) -> Option<&[u8]> {
        self.raw.paging_state.as_deref()
    }

    /// `[applied]` flag; `None` for non-conditional statements
    #[must_use]
    pub fn was_applied(&self) -> Option<bool> {
        self.raw.applied
    }

    /// Fail with [`CqlError::ConditionalNotApplied`] if the server rejected
    /// a conditional statement.
    ///
    /// # Errors
    ///
    /// Returns `ConditionalNotApplied` carrying the server's row, if any,
    /// exactly as the driver reported it.
    pub fn check_applied(&self) -> Result<(), CqlError> {
        if self.raw.applied == Some(false) {
            return Err(CqlError::ConditionalNotApplied {
                existing: self.raw.rows.first().cloned(),
            });
        }
        Ok(())
    }
}

/// A named driver session backed by a worker pool
pub struct Connection {
    name: String,
    pool: WorkerPool,
    config: SessionConfig,
}

impl Connection {
    /// Start a connection over `driver`, spawning `config.worker_threads` workers.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Driver` if the worker threads cannot be started.
    pub fn new(name: impl Into<String>, driver: Arc<dyn CqlDriver>, config: SessionConfig) -> Result<Self, CqlError> {
        let name = name.into();
        let pool = WorkerPool::new(&name, driver, config.worker_threads)?;
        log::debug!("connection '{name}' started with {} workers", pool.size());
        Ok(Self { name, pool, config })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Execute a request without blocking the caller's scheduler.
    ///
    /// Unset consistency and timeout fall back to the connection's config.
    /// Dropping the future before it completes suppresses delivery of the
    /// result; the driver call itself is not interrupted.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Driver` with whatever the driver call failed with.
    pub async fn execute_async(&self, mut request: Request) -> Result<ResultSet, CqlError> {
        if request.consistency.is_none() {
            request.consistency = self.config.default_consistency;
        }
        if request.timeout.is_none() {
            request.timeout = self.config.default_timeout();
        }
        log::trace!("[{}] {}", self.name, request.cql);

        #[cfg(feature = "tracing")]
        let span = tracing_helpers::execute_statement_span(&self.name, &request.cql);

        let submit = self.pool.submit(request);
        #[cfg(feature = "tracing")]
        let submit = submit.instrument(span);

        let raw = submit.await?;
        Ok(ResultSet::new(raw))
    }

    /// Execute a raw CQL string with parameters.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Driver` on driver failure.
    pub async fn execute(
        &self,
        cql: impl Into<String>,
        params: Vec<crate::value::Value>,
        consistency: Option<Consistency>,
    ) -> Result<ResultSet, CqlError> {
        let mut request = Request::new(cql, params);
        request.consistency = consistency;
        self.execute_async(request).await
    }
}

/// Registry of named connections
#[derive(Default)]
pub struct Connections {
    connections: HashMap<String, Arc<Connection>>,
    default: Option<String>,
}

impl Connections {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding one connection as the default
    #[must_use]
    pub fn single(connection: Connection) -> Self {
        let mut registry = Self::new();
        registry.register(connection, true);
        registry
    }

    /// Register a connection; the first one registered becomes the default
    /// unless another is explicitly marked as default.
    pub fn register(&mut self, connection: Connection, default: bool) -> Arc<Connection> {
        let name = connection.name().to_string();
        let connection = Arc::new(connection);
        if default || self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.connections.insert(name, Arc::clone(&connection));
        connection
    }

    /// Remove a connection by name.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<Connection>> {
        if self.default.as_deref() == Some(name) {
            self.default = None;
        }
        self.connections.remove(name)
    }

    /// Resolve a connection by name, or the default when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Configuration` for an unknown name or when no
    /// default is registered.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<Connection>, CqlError> {
        let name = match name {
            Some(n) => n,
            None => self
                .default
                .as_deref()
                .ok_or_else(|| CqlError::Configuration("no default connection registered".to_string()))?,
        };
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| CqlError::Configuration(format!("connection name '{name}' doesn't exist in the registry")))
    }
}
