//! Driver worker pool.
//!
//! - `config`: [`SessionConfig`] loading
//! - `manager`: [`WorkerPool`], the submit side
//! - `worker`: the blocking worker loop
//! - `types`: job types crossing the queue

pub mod config;
pub mod manager;
pub mod types;
pub mod worker;

pub use config::SessionConfig;
pub use manager::WorkerPool;
