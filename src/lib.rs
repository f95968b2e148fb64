//! # cqlguard
//!
//! Async object mapper for CQL tables over a blocking driver.
//!
//! Driver calls run on a worker pool and complete through a oneshot channel,
//! so awaiting tasks never block the scheduler thread. On top of that bridge
//! sit table schemas, change-tracked records, a statement compiler for
//! INSERT / UPDATE / DELETE, batches, and paginated querysets.
//!
//! ```no_run
//! use cqlguard::{ColumnDef, ColumnType, Connection, Connections, SessionConfig, TableSchema, Value, WriteOptions};
//! use cqlguard::test_helpers::MockDriver;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), cqlguard::CqlError> {
//! let users = TableSchema::builder("app", "users")
//!     .column(ColumnDef::new("id", ColumnType::Int).partition_key())
//!     .column(ColumnDef::new("name", ColumnType::Text))
//!     .build()?;
//!
//! let connections = Connections::single(Connection::new(
//!     "main",
//!     Arc::new(MockDriver::new()),
//!     SessionConfig::default(),
//! )?);
//!
//! let mut ann = users.create(&connections, vec![("id", Value::Int(1)), ("name", Value::from("ann"))]).await?;
//! ann.update(&connections, &WriteOptions::new(), vec![("name", Value::Null)]).await?;
//! # Ok(())
//! # }
//! ```

pub mod active_model;
pub mod batch;
pub mod config;
pub mod connection;
pub mod dml;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod model;
pub mod pool;
pub mod query;
pub mod routing;
pub mod statement;
pub mod test_helpers;
pub mod value;

pub use active_model::{FieldValue, Record};
pub use batch::{Batch, BatchType};
pub use config::SessionConfig;
pub use connection::{Connection, Connections, ResultSet};
pub use dml::{Target, WriteOptions, WriteTimestamp};
pub use error::CqlError;
pub use executor::{Consistency, CqlDriver, DriverError, RawResult, Request, Row};
pub use model::{ColumnDef, ColumnRole, ColumnType, TableSchema, TableSchemaBuilder};
pub use query::{Pages, QuerySet};
pub use value::{TryGetable, Value, ValueExtractionError, ValueType};
