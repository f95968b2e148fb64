//! Observability hooks.
//!
//! With the `metrics` feature, [`METRICS`] records driver activity through the
//! global OpenTelemetry meter. With the `tracing` feature, `tracing_helpers`
//! builds the spans entered around statement submission.

#[cfg(feature = "metrics")]
pub use otel::{CqlMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram, UpDownCounter},
    };
    use std::time::Duration;

    pub static METRICS: Lazy<CqlMetrics> = Lazy::new(CqlMetrics::init);

    pub struct CqlMetrics {
        pub statements_total: Counter<u64>,
        pub statement_errors_total: Counter<u64>,
        pub statement_duration: Histogram<f64>,
        pub handoff_wait_duration: Histogram<f64>,
        pub batches_total: Counter<u64>,
        pub queue_depth: UpDownCounter<i64>,
    }

    impl CqlMetrics {
        pub fn init() -> Self {
            let meter = global::meter("cqlguard");

            let statements_total = meter
                .u64_counter("cqlguard_statements_total")
                .with_description("Statements executed by driver workers")
                .build();

            let statement_errors_total = meter
                .u64_counter("cqlguard_statement_errors_total")
                .with_description("Statements that failed in the driver")
                .build();

            let statement_duration = meter
                .f64_histogram("cqlguard_statement_duration_seconds")
                .with_description("Duration of blocking driver calls")
                .build();

            let handoff_wait_duration = meter
                .f64_histogram("cqlguard_handoff_wait_seconds")
                .with_description("Time from submission until the result was ready for handoff")
                .build();

            let batches_total = meter
                .u64_counter("cqlguard_batches_total")
                .with_description("Batch envelopes submitted")
                .build();

            let queue_depth = meter
                .i64_up_down_counter("cqlguard_worker_queue_depth")
                .with_description("Jobs waiting for a driver worker")
                .build();

            Self {
                statements_total,
                statement_errors_total,
                statement_duration,
                handoff_wait_duration,
                batches_total,
                queue_depth,
            }
        }

        pub fn record_statement(&self, elapsed: Duration, failed: bool) {
            self.statements_total.add(1, &[]);
            if failed {
                self.statement_errors_total.add(1, &[]);
            }
            self.statement_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn observe_wait(&self, elapsed: Duration) {
            self.handoff_wait_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_batch(&self) {
            self.batches_total.add(1, &[]);
        }

        pub fn adjust_queue_depth(&self, delta: i64) {
            self.queue_depth.add(delta, &[]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    /// Statement text is truncated so spans stay small
    const MAX_CQL_IN_SPAN: usize = 200;

    fn truncate(cql: &str) -> &str {
        match cql.char_indices().nth(MAX_CQL_IN_SPAN) {
            Some((idx, _)) => &cql[..idx],
            None => cql,
        }
    }

    pub fn execute_statement_span(connection: &str, cql: &str) -> Span {
        info_span!("cqlguard.execute", connection = connection, cql = truncate(cql))
    }

    pub fn batch_span(connection: &str, statements: usize) -> Span {
        info_span!("cqlguard.batch", connection = connection, statements = statements)
    }

    pub fn page_fetch_span(table: &str, page: usize) -> Span {
        info_span!("cqlguard.page", table = table, page = page)
    }

}
