//! Configuration re-exported at the crate root.
//!
//! Exposes [`SessionConfig`] so applications can load settings from
//! `config/cqlguard.toml` or `CQLGUARD__*` environment variables with
//! `SessionConfig::load()`.

pub use crate::pool::config::*;
