//! Model schemas.
//!
//! - `column`: [`ColumnDef`], [`ColumnType`] and column roles
//! - `schema`: [`TableSchema`] and its builder, polymorphic variants

pub mod column;
pub mod schema;

pub use column::{ColumnDef, ColumnRole, ColumnType, DefaultValue};
pub use schema::{Polymorphic, TableSchema, TableSchemaBuilder};
