use crate::executor::{CqlDriver, DriverError};
use crate::pool::types::{DriverJob, DriverResult};
use crossbeam_channel::Receiver;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// The worker thread entrypoint.
///
/// Runs until every sender for `rx` is dropped. Each job runs the blocking
/// driver call to completion; the result is delivered only if the awaiting
/// side still holds its receiver.
pub fn run_worker_loop(rx: Receiver<DriverJob>, driver: Arc<dyn CqlDriver>, queue_depth: Arc<AtomicUsize>) {
    while let Ok(job) = rx.recv() {
        queue_depth.fetch_sub(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        METRICS.adjust_queue_depth(-1);
        match job {
            DriverJob::Execute {
                request,
                responder,
                enqueued_at,
            } => {
                let started = Instant::now();
                let result = call_driver(driver.as_ref(), &request);

                #[cfg(feature = "metrics")]
                {
                    METRICS.record_statement(started.elapsed(), result.is_err());
                    METRICS.observe_wait(enqueued_at.elapsed());
                }
                #[cfg(not(feature = "metrics"))]
                let _ = (started, enqueued_at);

                // cancelled while the call ran: drop the result
                if responder.is_closed() {
                    log::debug!("discarding result for cancelled statement: {}", request.cql);
                    continue;
                }
                let _ = responder.send(result);
            }
        }
    }
}

fn call_driver(driver: &dyn CqlDriver, request: &crate::executor::Request) -> DriverResult {
    match catch_unwind(AssertUnwindSafe(|| driver.execute(request))) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(DriverError::Panicked(msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{RawResult, Request};
    use std::time::Instant;
    use tokio::sync::oneshot;

    struct Panicky;

    impl CqlDriver for Panicky {
        fn execute(&self, _request: &Request) -> DriverResult {
            panic!("driver exploded")
        }
    }

    struct Echo;

    impl CqlDriver for Echo {
        fn execute(&self, _request: &Request) -> DriverResult {
            Ok(RawResult::default())
        }
    }

    fn run_one(driver: Arc<dyn CqlDriver>) -> DriverResult {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (resp_tx, resp_rx) = oneshot::channel();
        let depth = Arc::new(AtomicUsize::new(1));
        tx.send(DriverJob::Execute {
            request: Request::new("SELECT 1", vec![]),
            responder: resp_tx,
            enqueued_at: Instant::now(),
        })
        .unwrap();
        drop(tx);
        run_worker_loop(rx, driver, Arc::clone(&depth));
        assert_eq!(depth.load(Ordering::Relaxed), 0);
        resp_rx.blocking_recv().unwrap()
    }

    #[test]
    fn test_panic_becomes_driver_error() {
        let res = run_one(Arc::new(Panicky));
        assert_eq!(res, Err(DriverError::Panicked("driver exploded".to_string())));
    }

    #[test]
    fn test_result_delivered() {
        assert_eq!(run_one(Arc::new(Echo)), Ok(RawResult::default()));
    }
}
