//! Mutable entities.
//!
//! - **`FieldValue`**: one column slot with its previous value and explicit flag
//! - **`Record`**: a model instance; `save`, `update` and `delete` compile its
//!   slots into statements through [`crate::dml`]

pub mod record;
pub mod value;

pub use record::Record;
pub use value::FieldValue;
