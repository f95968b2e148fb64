//! Value type system for cqlguard
//!
//! - **`Value`** - a single CQL cell
//! - **`ValueType`** - maps Rust types to their `Value` variant
//! - **`TryGetable`** - extraction that separates null from type mismatch
//! - **`encode`** - native-protocol serialization used for routing keys

pub mod encode;
pub mod try_getable;
pub mod types;

pub use try_getable::{TryGetable, ValueExtractionError};
pub use types::{Value, ValueType};
