//! Statement dispatch: queue on a batch, or run now through the bridge.

use crate::batch::Batch;
use crate::connection::{Connections, ResultSet};
use crate::dml::WriteOptions;
use crate::error::CqlError;
use crate::model::TableSchema;
use crate::routing::routing_key_for;
use crate::statement::Statement;

/// Where a write goes
pub enum Target<'a> {
    /// Execute immediately on a registered connection
    Direct(&'a Connections),
    /// Queue on a batch
    Batch(&'a mut Batch),
}

impl<'a> From<&'a Connections> for Target<'a> {
    fn from(connections: &'a Connections) -> Self {
        Target::Direct(connections)
    }
}

impl<'a> From<&'a mut Batch> for Target<'a> {
    fn from(batch: &'a mut Batch) -> Self {
        Target::Batch(batch)
    }
}

/// Execute or queue one statement for `schema`.
///
/// Returns `None` when the statement was queued on a batch.
///
/// # Errors
///
/// `Configuration` for a per-call connection in batch mode or a batch
/// connection mismatch, raised before anything is queued or sent. Direct
/// execution returns driver errors and, for conditional statements,
/// `ConditionalNotApplied`.
pub(crate) async fn execute_statement(
    target: &mut Target<'_>,
    schema: &TableSchema,
    statement: Statement,
    options: &WriteOptions,
) -> Result<Option<ResultSet>, CqlError> {
    let connection_name = options.connection.as_deref().or(schema.connection());
    match target {
        Target::Batch(batch) => {
            if options.connection.is_some() {
                return Err(CqlError::Configuration(
                    "Cannot specify a connection on model in batch mode.".to_string(),
                ));
            }
            batch.bind_connection(connection_name)?;
            batch.add_query(statement);
            Ok(None)
        }
        Target::Direct(connections) => {
            let connection = connections.get(connection_name)?;
            let mut request = statement.to_request();
            request.consistency = options.consistency.or(schema.consistency());
            request.timeout = options.timeout;

            let keys: Vec<&str> = schema.partition_keys().map(|c| c.db_field_name()).collect();
            request.routing_key =
                routing_key_for(statement.partition_key_values(&keys), connection.config().protocol_version);
            if request.routing_key.is_some() {
                request.keyspace = Some(schema.keyspace().to_string());
            }

            let result = connection.execute_async(request).await?;
            if statement.is_conditional() {
                result.check_applied()?;
            }
            Ok(Some(result))
        }
    }
}
