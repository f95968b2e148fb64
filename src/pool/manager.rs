//! Worker pool that runs blocking driver calls off the cooperative scheduler.
//!
//! Jobs go onto one shared crossbeam queue; every worker thread pulls from
//! it. Completion travels back on a per-job `tokio::sync::oneshot`, so the
//! awaiting task never shares mutable state with a worker thread.

use crate::executor::{CqlDriver, DriverError, Request};
use crate::pool::types::{DriverJob, DriverResult};
use crate::pool::worker::run_worker_loop;
use crossbeam_channel::{unbounded, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::oneshot;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

pub struct WorkerPool {
    sender: Option<Sender<DriverJob>>,
    workers: Vec<JoinHandle<()>>,
    queue_depth: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `size` worker threads sharing `driver`.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::WorkerUnavailable` if a thread cannot be spawned.
    pub fn new(name: &str, driver: Arc<dyn CqlDriver>, size: usize) -> Result<Self, DriverError> {
        let (tx, rx) = unbounded::<DriverJob>();
        let queue_depth = Arc::new(AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(size.max(1));

        for i in 0..size.max(1) {
            let rx = rx.clone();
            let driver = Arc::clone(&driver);
            let depth = Arc::clone(&queue_depth);
            let handle = std::thread::Builder::new()
                .name(format!("cqlguard-{name}-{i}"))
                .spawn(move || run_worker_loop(rx, driver, depth))
                .map_err(|e| DriverError::WorkerUnavailable(format!("failed to spawn worker: {e}")))?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(tx),
            workers,
            queue_depth,
        })
    }

    /// Queue a request and await its result.
    ///
    /// Dropping the returned future before it resolves cancels delivery: the
    /// driver call still runs to completion on its worker, but the result is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns `DriverError` from the driver, or `WorkerUnavailable` if the
    /// pool has shut down.
    pub async fn submit(&self, request: Request) -> DriverResult {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| DriverError::WorkerUnavailable("pool is shut down".to_string()))?;

        let (responder, receiver) = oneshot::channel();
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        METRICS.adjust_queue_depth(1);

        let sent = sender.send(DriverJob::Execute {
            request,
            responder,
            enqueued_at: Instant::now(),
        });
        if sent.is_err() {
            self.queue_depth.fetch_sub(1, Ordering::Relaxed);
            #[cfg(feature = "metrics")]
            METRICS.adjust_queue_depth(-1);
            return Err(DriverError::WorkerUnavailable("worker queue closed".to_string()));
        }

        receiver
            .await
            .map_err(|_| DriverError::WorkerUnavailable("worker dropped the request".to_string()))?
    }

    /// Jobs queued but not yet picked up by a worker
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue and wait for workers to finish queued jobs.
    pub fn shutdown(mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // workers exit once the queue drains; not joined here to avoid
        // blocking the scheduler thread
        self.sender.take();
    }
}
