//! Record persistence: INSERT / UPDATE / DELETE compilation and dispatch.
//!
//! [`DmlQuery`] turns a record's tracked field slots into the minimal set of
//! statements for one save, update or delete, and hands each statement to
//! [`execute_statement`], which either queues it on a batch or runs it on a
//! connection.
//!
//! The branching mirrors how wide-row tables behave:
//!
//! - A record whose clustering keys are all null can only write static and
//!   partition-key columns ("static save only").
//! - Null values are never written; a null that replaced a value, or was
//!   assigned explicitly, becomes a column DELETE after the write.
//! - Counter tables always go through UPDATE with delta assignments.

pub mod executor;
pub mod options;

pub use executor::Target;
pub use options::{Condition, WriteOptions, WriteTimestamp};

use crate::active_model::Record;
use crate::connection::ResultSet;
use crate::error::CqlError;
use crate::model::TableSchema;
use crate::statement::{AssignOp, Assignment, DeleteStatement, InsertStatement, Predicate, Statement, UpdateStatement};
use executor::execute_statement;
use std::collections::HashSet;
use std::sync::Arc;

pub(crate) struct DmlQuery<'o, 't> {
    schema: Arc<TableSchema>,
    target: Target<'t>,
    options: &'o WriteOptions,
    timestamp: Option<i64>,
    conditionals: Vec<Predicate>,
}

impl<'o, 't> DmlQuery<'o, 't> {
    /// # Errors
    ///
    /// Returns `CqlError::Validation` if a condition names an unknown column.
    pub(crate) fn new(schema: Arc<TableSchema>, target: Target<'t>, options: &'o WriteOptions) -> Result<Self, CqlError> {
        let conditionals = options.conditionals(&schema)?;
        Ok(Self {
            schema,
            target,
            options,
            timestamp: options.timestamp_micros(),
            conditionals,
        })
    }

    async fn execute(&mut self, statement: Statement) -> Result<Option<ResultSet>, CqlError> {
        execute_statement(&mut self.target, &self.schema, statement, self.options).await
    }

    /// Insert a new record, or update it if it can be updated in place.
    pub(crate) async fn save(&mut self, record: &mut Record) -> Result<(), CqlError> {
        let schema = Arc::clone(&self.schema);
        if schema.has_counter() || record.can_update() {
            if schema.has_counter() {
                log::warn!(
                    "'create' and 'save' actions on Counters are deprecated. A future version will disallow this. Use the 'update' mechanism instead."
                );
            }
            return self.update(record).await;
        }

        let mut insert = InsertStatement::new(schema.column_family_name());
        insert.ttl = self.options.ttl;
        insert.timestamp = self.timestamp;
        insert.if_not_exists = self.options.if_not_exists;

        let static_save_only = record.clustering_keys_all_null();
        for (col, slot) in schema.columns().iter().zip(record.slots_mut()) {
            if static_save_only && !col.is_static() && !col.is_partition_key() {
                continue;
            }
            if col.is_null(slot.value()) {
                continue;
            }
            // defaults that were never assigned still have to be persisted
            if col.has_default() && !slot.changed() {
                slot.mark_explicit();
            }
            insert.add_assignment(col.db_field_name(), slot.value().clone());
        }

        if !insert.is_empty() {
            self.execute(insert.into()).await?;
        }
        if !static_save_only {
            self.delete_null_columns(record, Vec::new()).await?;
        }
        Ok(())
    }

    /// Write changed columns (and every counter) with an UPDATE, then delete
    /// explicitly nulled columns.
    pub(crate) async fn update(&mut self, record: &mut Record) -> Result<(), CqlError> {
        let schema = Arc::clone(&self.schema);
        let null_clustering_key = record.clustering_keys_all_null();
        let mut static_changed_only = true;

        let mut update = UpdateStatement::new(schema.column_family_name());
        update.ttl = self.options.ttl;
        update.timestamp = self.timestamp;
        update.conditionals = self.conditionals.clone();
        update.if_exists = self.options.if_exists;

        let mut updated_columns = HashSet::new();
        for (col, slot) in schema.columns().iter().zip(record.slots()) {
            if null_clustering_key && !col.is_static() && !col.is_partition_key() {
                continue;
            }
            if col.is_primary_key() || col.is_null(slot.value()) {
                continue;
            }
            if !slot.changed() && !col.is_counter() {
                continue;
            }
            static_changed_only = static_changed_only && col.is_static();
            let op = if col.is_counter() {
                AssignOp::Counter {
                    previous: slot.previous().clone(),
                }
            } else {
                AssignOp::Set
            };
            update.add_assignment(Assignment::new(col.db_field_name(), op, slot.value().clone()));
            updated_columns.insert(col.db_field_name().to_string());
        }

        if !update.is_empty() {
            for col in schema.primary_keys() {
                // static-only writes address the partition, not the row
                if (null_clustering_key || static_changed_only) && !col.is_partition_key() {
                    continue;
                }
                update.add_where(Predicate::eq(col.db_field_name(), record.value_of(col.name()).clone()));
            }
            self.execute(update.into()).await?;
        }

        if !null_clustering_key {
            let conditionals = self
                .conditionals
                .iter()
                .filter(|c| !updated_columns.contains(&c.field))
                .cloned()
                .collect();
            self.delete_null_columns(record, conditionals).await?;
        }
        Ok(())
    }

    /// Delete the record's row, keyed by its primary key.
    pub(crate) async fn delete(&mut self, record: &Record) -> Result<(), CqlError> {
        let schema = Arc::clone(&self.schema);
        let mut delete = DeleteStatement::new(schema.column_family_name());
        delete.timestamp = self.timestamp;
        delete.conditionals = self.conditionals.clone();
        delete.if_exists = self.options.if_exists;
        for col in schema.primary_keys() {
            let value = record.value_of(col.name());
            if col.is_null(value) && !col.is_partition_key() {
                continue;
            }
            delete.add_where(Predicate::eq(col.db_field_name(), value.clone()));
        }
        self.execute(delete.into()).await?;
        Ok(())
    }

    /// DELETE the columns whose slots were nulled.
    async fn delete_null_columns(&mut self, record: &Record, conditionals: Vec<Predicate>) -> Result<(), CqlError> {
        let schema = Arc::clone(&self.schema);
        let mut delete = DeleteStatement::new(schema.column_family_name());
        delete.conditionals = conditionals;
        delete.if_exists = self.options.if_exists;

        let mut static_only = true;
        for (col, slot) in schema.columns().iter().zip(record.slots()) {
            if col.is_primary_key() || !slot.deleted(col) {
                continue;
            }
            delete.add_field(col.db_field_name());
            static_only = static_only && col.is_static();
        }
        if delete.fields.is_empty() {
            return Ok(());
        }

        for col in schema.primary_keys() {
            if static_only && !col.is_partition_key() {
                continue;
            }
            delete.add_where(Predicate::eq(col.db_field_name(), record.value_of(col.name()).clone()));
        }
        self.execute(delete.into()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Batch, BatchType};
    use crate::model::{ColumnDef, ColumnType};

    #[tokio::test]
    async fn test_save_with_nothing_to_insert_sends_nothing() {
        let schema = TableSchema::builder("app", "notes")
            .column(ColumnDef::new("id", ColumnType::Int).partition_key())
            .column(ColumnDef::new("body", ColumnType::Text))
            .build()
            .unwrap();
        let mut record = Record::new(&schema, vec![]).unwrap();
        let mut batch = Batch::new(BatchType::Logged);
        let options = WriteOptions::new();

        DmlQuery::new(Arc::clone(&schema), Target::Batch(&mut batch), &options)
            .unwrap()
            .save(&mut record)
            .await
            .unwrap();

        assert!(batch.is_empty());
    }
}
