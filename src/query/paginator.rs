//! Page-by-page iteration with server paging cursors.

use crate::active_model::Record;
use crate::connection::Connections;
use crate::error::CqlError;
use crate::executor::Request;
use crate::model::TableSchema;
use crate::query::QuerySet;
use crate::routing::routing_key_for;
use crate::statement::RenderContext;
use crate::value::Value;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "tracing")]
use tracing::Instrument;

#[derive(Debug)]
enum PageState {
    Start,
    Next(Vec<u8>),
    Done,
}

/// Lazy sequence of result pages.
///
/// Each [`Pages::next_page`] call issues one fetch with the previous page's
/// cursor and yields every row of that page. The sequence ends after the
/// page whose cursor comes back empty; a failed fetch ends it too.
pub struct Pages<'a> {
    connections: &'a Connections,
    schema: Arc<TableSchema>,
    connection: Option<String>,
    request: Request,
    routing_partition: Vec<Option<Value>>,
    fetch_size: Option<i32>,
    state: PageState,
    page: usize,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(queryset: &QuerySet, connections: &'a Connections) -> Self {
        let select = queryset.select_statement();
        let mut ctx = RenderContext::new();
        let cql = select.render(&mut ctx);

        let options = queryset.options();
        let schema = Arc::clone(queryset.schema());
        let mut request = Request::new(cql, ctx.into_params());
        request.consistency = options.consistency.or(schema.consistency());
        request.timeout = options.timeout;

        let keys: Vec<&str> = schema.partition_keys().map(|c| c.db_field_name()).collect();
        let routing_partition = select.partition_key_values(&keys);

        Self {
            connections,
            connection: options.connection.clone().or_else(|| schema.connection().map(str::to_string)),
            schema,
            request,
            routing_partition,
            fetch_size: queryset.fetch_size,
            state: PageState::Start,
            page: 0,
        }
    }

    /// Pages yielded so far
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.page
    }

    /// Fetch the next page, or `None` once the cursor is exhausted.
    pub async fn next_page(&mut self) -> Option<Result<Vec<Record>, CqlError>> {
        let paging_state = match std::mem::replace(&mut self.state, PageState::Done) {
            PageState::Done => return None,
            PageState::Start => None,
            PageState::Next(cursor) => Some(cursor),
        };
        match self.fetch(paging_state).await {
            Ok((records, cursor)) => {
                self.page += 1;
                // an empty cursor ends the sequence like an absent one
                self.state = cursor
                    .filter(|c| !c.is_empty())
                    .map_or(PageState::Done, PageState::Next);
                Some(Ok(records))
            }
            Err(err) => Some(Err(err)),
        }
    }

    async fn fetch(&self, paging_state: Option<Vec<u8>>) -> Result<(Vec<Record>, Option<Vec<u8>>), CqlError> {
        let connection = self.connections.get(self.connection.as_deref())?;
        let mut request = self.request.clone();
        request.paging_state = paging_state;
        request.fetch_size = Some(self.fetch_size.unwrap_or(connection.config().fetch_size));
        request.routing_key = routing_key_for(self.routing_partition.clone(), connection.config().protocol_version);
        if request.routing_key.is_some() {
            request.keyspace = Some(self.schema.keyspace().to_string());
        }

        let submit = connection.execute_async(request);
        #[cfg(feature = "tracing")]
        let submit = submit.instrument(tracing_helpers::page_fetch_span(self.schema.table(), self.page));

        let result = submit.await?;
        let cursor = result.paging_state().map(<[u8]>::to_vec);
        let records = result
            .into_rows()
            .into_iter()
            .map(|row| Record::from_row(&self.schema, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, cursor))
    }
}
