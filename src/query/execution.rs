//! Async operations on a [`QuerySet`].

use crate::active_model::Record;
use crate::connection::Connections;
use crate::dml::executor::execute_statement;
use crate::dml::Target;
use crate::error::CqlError;
use crate::model::ColumnType;
use crate::query::{Pages, QuerySet};
use crate::statement::{AssignOp, Assignment, DeleteStatement, UpdateStatement};
use crate::value::Value;
use std::collections::HashSet;

impl QuerySet {
    /// Lazy page-by-page iteration
    #[must_use]
    pub fn iterate<'a>(&self, connections: &'a Connections) -> Pages<'a> {
        Pages::new(self, connections)
    }

    /// Fetch pages until `max_rows` records are held or the cursor runs out.
    async fn fetch(&self, connections: &Connections, max_rows: Option<usize>) -> Result<Vec<Record>, CqlError> {
        let mut pages = self.iterate(connections);
        let mut records = Vec::new();
        while let Some(page) = pages.next_page().await {
            records.extend(page?);
            if max_rows.is_some_and(|max| records.len() >= max) {
                break;
            }
        }
        Ok(records)
    }

    /// Execute the SELECT unless already materialized.
    ///
    /// # Errors
    ///
    /// Returns driver errors from any page fetch.
    pub async fn all(mut self, connections: &Connections) -> Result<Self, CqlError> {
        if self.result_cache.is_none() {
            let records = self.fetch(connections, None).await?;
            self.result_cache = Some(records);
        }
        Ok(self)
    }

    /// The single record this queryset matches.
    ///
    /// Uniqueness is checked by looking for a second row, not with a COUNT.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` for no match, `MultipleObjectsReturned` for more than
    /// one, or a driver error.
    pub async fn get(self, connections: &Connections) -> Result<Record, CqlError> {
        let mut records = match self.result_cache {
            Some(ref cached) => cached.clone(),
            None => self.fetch(connections, Some(2)).await?,
        };
        if records.len() > 1 {
            return Err(CqlError::MultipleObjectsReturned(format!(
                "Multiple objects found in {}",
                self.schema.table()
            )));
        }
        records
            .pop()
            .ok_or_else(|| CqlError::DoesNotExist(format!("{} matching query does not exist", self.schema.table())))
    }

    /// Create and save one record with this queryset's write options.
    ///
    /// # Errors
    ///
    /// As for [`Record::new`] and [`Record::save`].
    pub async fn create<'t>(&self, target: impl Into<Target<'t>>, values: Vec<(&str, Value)>) -> Result<Record, CqlError> {
        let mut record = Record::new(&self.schema, values)?;
        record.save(target, &self.options).await?;
        Ok(record)
    }

    /// Blind update of every row this queryset matches.
    ///
    /// Names take an optional collection operation suffix. Null values
    /// delete the column instead. All names are validated before anything
    /// is sent.
    ///
    /// # Errors
    ///
    /// `Validation` for unknown columns, primary-key columns, a bad
    /// operation, or an invalid value; then driver or conditional errors.
    pub async fn update<'t>(&self, target: impl Into<Target<'t>>, values: Vec<(&str, Value)>) -> Result<(), CqlError> {
        if values.is_empty() {
            return Ok(());
        }
        let schema = &self.schema;
        let conditionals = self.options.conditionals(schema)?;
        let wheres = self.where_clause();

        let mut update = UpdateStatement::new(schema.column_family_name());
        update.wheres = wheres.clone();
        update.ttl = self.options.ttl;
        update.timestamp = self.options.timestamp_micros();
        update.conditionals = conditionals.clone();
        update.if_exists = self.options.if_exists;

        let mut nulled = Vec::new();
        let mut updated_columns = HashSet::new();
        for (name, value) in values {
            let (column, op) = match name.rsplit_once("__") {
                Some((column, suffix)) if schema.column(column).is_some() => (column, AssignOp::parse(suffix)?),
                _ => (name, AssignOp::Set),
            };
            let col = schema.column_or_err(column)?;
            if col.is_primary_key() {
                return Err(CqlError::Validation(format!(
                    "Cannot apply update to primary key '{column}' for {}",
                    schema.table()
                )));
            }

            let value = match (&op, col.column_type()) {
                (AssignOp::Remove, ColumnType::Map(key_type, _)) => match value {
                    Value::Set(keys) => Value::Set(
                        keys.into_iter()
                            .map(|k| key_type.check(column, k))
                            .collect::<Result<_, _>>()?,
                    ),
                    other => {
                        return Err(CqlError::Validation(format!(
                            "Cannot apply update operation 'remove' on column '{column}' with value '{other}'. A set is required."
                        )))
                    }
                },
                _ => col.validate(value)?,
            };

            if value.is_null() {
                nulled.push(col.db_field_name().to_string());
                continue;
            }
            let op = match op {
                AssignOp::Set if col.is_counter() => AssignOp::Counter { previous: Value::Null },
                op => op,
            };
            update.add_assignment(Assignment::new(col.db_field_name(), op, value));
            updated_columns.insert(col.db_field_name().to_string());
        }

        let mut target = target.into();
        if !update.is_empty() {
            execute_statement(&mut target, schema, update.into(), &self.options).await?;
        }

        if !nulled.is_empty() {
            let mut delete = DeleteStatement::new(schema.column_family_name());
            delete.fields = nulled;
            delete.wheres = wheres;
            delete.conditionals = conditionals
                .into_iter()
                .filter(|c| !updated_columns.contains(&c.field))
                .collect();
            delete.if_exists = self.options.if_exists;
            execute_statement(&mut target, schema, delete.into(), &self.options).await?;
        }
        Ok(())
    }
}
