//! Batch accumulator.
//!
//! Writes routed through a [`Batch`] are queued instead of executed. On
//! [`Batch::execute`] the queue is rendered into one envelope:
//!
//! ```text
//! BEGIN [UNLOGGED |COUNTER ]BATCH [USING TIMESTAMP t]
//!   <statement 1>
//!   <statement 2>
//! APPLY BATCH;
//! ```
//!
//! Every statement renders through the same parameter context, so bind
//! slots run `:p0..:pN` across the whole envelope in queue order.
//!
//! All statements of a batch must target one connection. The first queued
//! statement binds the batch to its model's connection; a later statement
//! for a different connection is rejected when it is queued. A batch given
//! an explicit connection ignores model connections altogether.

use crate::connection::Connections;
use crate::dml::WriteTimestamp;
use crate::error::CqlError;
use crate::executor::{Consistency, Request};
use crate::statement::{RenderContext, Statement};
use std::fmt;
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "tracing")]
use tracing::Instrument;

/// Batch kind token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchType {
    #[default]
    Logged,
    Unlogged,
    Counter,
}

type Callback = Box<dyn FnMut() + Send>;

pub struct Batch {
    batch_type: BatchType,
    queries: Vec<Statement>,
    callbacks: Vec<Callback>,
    connection: Option<String>,
    bound: bool,
    explicit: bool,
    executed: bool,
    warn_multiple_exec: Option<bool>,
    timestamp: Option<WriteTimestamp>,
    consistency: Option<Consistency>,
    timeout: Option<Duration>,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new(BatchType::Logged)
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("batch_type", &self.batch_type)
            .field("queries", &self.queries.len())
            .field("callbacks", &self.callbacks.len())
            .field("connection", &self.connection)
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}

impl Batch {
    #[must_use]
    pub fn new(batch_type: BatchType) -> Self {
        Self {
            batch_type,
            queries: Vec::new(),
            callbacks: Vec::new(),
            connection: None,
            bound: false,
            explicit: false,
            executed: false,
            warn_multiple_exec: None,
            timestamp: None,
            consistency: None,
            timeout: None,
        }
    }

    /// Run on `name` regardless of the connections of queued models
    #[must_use]
    pub fn with_connection(mut self, name: impl Into<String>) -> Self {
        self.connection = Some(name.into());
        self.bound = true;
        self.explicit = true;
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

    /// Override the connection's `warn_multiple_exec` setting
    #[must_use]
    pub fn warn_multiple_exec(mut self, warn: bool) -> Self {
        self.warn_multiple_exec = Some(warn);
        self
    }

    /// Queue a statement; nothing is sent until [`Batch::execute`]
    pub fn add_query(&mut self, statement: impl Into<Statement>) {
        self.queries.push(statement.into());
    }

    /// Register a callback run after every `execute` call
    pub fn add_callback(&mut self, callback: impl FnMut() + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    #[must_use]
    pub fn queries(&self) -> &[Statement] {
        &self.queries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Connection the batch will run on; `None` is the default connection
    #[must_use]
    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Bind the batch to a model's connection, or check it matches the one
    /// already bound.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Configuration` when the batch is already bound to
    /// a different connection.
    pub fn bind_connection(&mut self, connection: Option<&str>) -> Result<(), CqlError> {
        if self.explicit {
            return Ok(());
        }
        if !self.bound {
            self.connection = connection.map(str::to_string);
            self.bound = true;
            return Ok(());
        }
        if self.connection.as_deref() != connection {
            return Err(CqlError::Configuration(format!(
                "Batch queries must be executed on the same connection: bound to {}, got {}",
                self.connection.as_deref().unwrap_or("<default>"),
                connection.unwrap_or("<default>")
            )));
        }
        Ok(())
    }

    /// Render the queued statements as one envelope request
    #[must_use]
    pub fn render(&self) -> Request {
        let mut opener = match self.batch_type {
            BatchType::Logged => "BEGIN BATCH".to_string(),
            BatchType::Unlogged => "BEGIN UNLOGGED BATCH".to_string(),
            BatchType::Counter => "BEGIN COUNTER BATCH".to_string(),
        };
        if let Some(ts) = self.timestamp {
            opener.push_str(&format!(" USING TIMESTAMP {}", ts.to_micros()));
        }

        let mut ctx = RenderContext::new();
        let mut lines = Vec::with_capacity(self.queries.len() + 2);
        lines.push(opener);
        for query in &self.queries {
            lines.push(format!("  {}", query.render(&mut ctx)));
        }
        lines.push("APPLY BATCH;".to_string());

        let mut request = Request::new(lines.join("\n"), ctx.into_params());
        request.consistency = self.consistency;
        request.timeout = self.timeout;
        request
    }

    fn run_callbacks(&mut self) {
        for callback in &mut self.callbacks {
            callback();
        }
    }

    /// Send the queued statements as one batch, then run callbacks.
    ///
    /// An empty queue sends nothing but still runs callbacks, which makes a
    /// repeated `execute` a no-op apart from its callbacks.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Configuration` if the bound connection is not
    /// registered, `ConditionalNotApplied` if a conditional batch was
    /// rejected, or the driver error. On error the queue is kept and
    /// callbacks do not run.
    pub async fn execute(&mut self, connections: &Connections) -> Result<(), CqlError> {
        let warn = self.warn_multiple_exec.unwrap_or_else(|| {
            connections
                .get(self.connection.as_deref())
                .map(|c| c.config().warn_multiple_exec)
                .unwrap_or(true)
        });
        if self.executed && warn {
            log::warn!("Batch executed multiple times.");
        }
        self.executed = true;

        if self.queries.is_empty() {
            self.run_callbacks();
            return Ok(());
        }

        let connection = connections.get(self.connection.as_deref())?;
        let conditional = self.queries.iter().any(Statement::is_conditional);
        let request = self.render();

        #[cfg(feature = "metrics")]
        METRICS.record_batch();

        let submit = connection.execute_async(request);
        #[cfg(feature = "tracing")]
        let submit = submit.instrument(tracing_helpers::batch_span(connection.name(), self.queries.len()));

        let result = submit.await?;
        if conditional {
            result.check_applied()?;
        }

        self.queries.clear();
        self.run_callbacks();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{DeleteStatement, InsertStatement, Predicate};
    use crate::value::Value;

    #[test]
    fn test_render_envelope() {
        let mut batch = Batch::new(BatchType::Unlogged).timestamp(42i64);
        let mut insert = InsertStatement::new("ks.t");
        insert.add_assignment("a", Value::Int(1));
        batch.add_query(insert);
        let mut delete = DeleteStatement::new("ks.t");
        delete.add_where(Predicate::eq("a", Value::Int(2)));
        batch.add_query(delete);

        let request = batch.render();
        assert_eq!(
            request.cql,
            "BEGIN UNLOGGED BATCH USING TIMESTAMP 42\n  INSERT INTO ks.t (\"a\") VALUES (:p0)\n  DELETE FROM ks.t WHERE \"a\" = :p1\nAPPLY BATCH;"
        );
        assert_eq!(request.params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_bind_connection_rejects_mismatch() {
        let mut batch = Batch::default();
        batch.bind_connection(Some("a")).unwrap();
        batch.bind_connection(Some("a")).unwrap();
        assert!(matches!(batch.bind_connection(None), Err(CqlError::Configuration(_))));
        assert!(matches!(batch.bind_connection(Some("b")), Err(CqlError::Configuration(_))));
    }

    #[test]
    fn test_explicit_connection_ignores_models() {
        let mut batch = Batch::default().with_connection("main");
        batch.bind_connection(Some("other")).unwrap();
        assert_eq!(batch.connection(), Some("main"));
    }
}
