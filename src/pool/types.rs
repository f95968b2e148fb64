use crate::executor::{DriverError, RawResult, Request};
use std::time::Instant;
use tokio::sync::oneshot;

pub type DriverResult = Result<RawResult, DriverError>;

/// Work item handed to a driver worker.
pub enum DriverJob {
    Execute {
        request: Request,
        /// Completion handoff back to the awaiting task
        responder: oneshot::Sender<DriverResult>,
        enqueued_at: Instant,
    },
}
