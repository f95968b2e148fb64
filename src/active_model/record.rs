//! `Record`: one mutable entity of a [`TableSchema`].

use crate::active_model::FieldValue;
use crate::dml::{DmlQuery, Target, WriteOptions};
use crate::error::CqlError;
use crate::executor::Row;
use crate::model::TableSchema;
use crate::value::{TryGetable, Value};
use std::sync::Arc;

static NULL: Value = Value::Null;

/// A model instance with per-column change tracking.
///
/// Slots are parallel to [`TableSchema::columns`]. A record built with
/// [`Record::new`] is not persisted; one read back from a query, or saved
/// successfully, is.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<TableSchema>,
    values: Vec<FieldValue>,
    persisted: bool,
}

impl Record {
    /// Build a new record from column values; unspecified columns take their
    /// default, or null.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` listing any names that are not columns.
    pub fn new(schema: &Arc<TableSchema>, values: Vec<(&str, Value)>) -> Result<Self, CqlError> {
        let unknown: Vec<&str> = values
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| schema.column(name).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(CqlError::Validation(format!("Incorrect columns passed: {unknown:?}")));
        }

        let mut slots: Vec<FieldValue> = schema
            .columns()
            .iter()
            .map(|col| FieldValue::new(col.get_default(), false))
            .collect();
        for (name, value) in values {
            if let Some(idx) = schema.column_index(name) {
                slots[idx] = FieldValue::new(value, true);
            }
        }
        Ok(Self {
            schema: Arc::clone(schema),
            values: slots,
            persisted: false,
        })
    }

    /// Materialize a result row.
    ///
    /// Reading through a polymorphic base resolves the row's discriminator to
    /// the registered variant schema.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Model` for a discriminator value with no
    /// registered variant.
    pub fn from_row(schema: &Arc<TableSchema>, mut row: Row) -> Result<Self, CqlError> {
        let discriminator = schema
            .discriminator_column()
            .and_then(|c| schema.column(c))
            .filter(|_| schema.is_polymorphic_base());
        let schema = match discriminator {
            Some(column) => {
                let key = row.get(column.db_field_name()).cloned().unwrap_or(Value::Null);
                schema.variant_for(&key).ok_or_else(|| {
                    CqlError::Model(format!(
                        "unrecognized discriminator value {key} for {}",
                        schema.table()
                    ))
                })?
            }
            None => Arc::clone(schema),
        };

        let values = schema
            .columns()
            .iter()
            .map(|col| FieldValue::loaded(row.remove(col.db_field_name()).unwrap_or(Value::Null)))
            .collect();
        Ok(Self {
            schema,
            values,
            persisted: true,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Current value of a column
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(FieldValue::value)
    }

    /// Typed value of a column.
    ///
    /// # Errors
    ///
    /// `CqlError::Validation` for an unknown column, a null, or a type mismatch.
    pub fn try_get<T: TryGetable>(&self, name: &str) -> Result<T, CqlError> {
        let value = self.schema.column_or_err(name).map(|_| self.value_of(name).clone())?;
        T::try_get(value).map_err(|e| CqlError::Validation(format!("{name}: {e}")))
    }

    /// Tracked slot of a column
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.schema.column_index(name).map(|idx| &self.values[idx])
    }

    /// Assign a column.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for an unknown column.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), CqlError> {
        let idx = self
            .schema
            .column_index(name)
            .ok_or_else(|| CqlError::Validation(format!("{} has no column named: {name}", self.schema.table())))?;
        self.values[idx].set(value.into());
        Ok(())
    }

    pub(crate) fn value_of(&self, name: &str) -> &Value {
        self.get(name).unwrap_or(&NULL)
    }

    pub(crate) fn slots(&self) -> &[FieldValue] {
        &self.values
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [FieldValue] {
        &mut self.values
    }

    /// Persisted, with no primary-key column changed since
    #[must_use]
    pub fn can_update(&self) -> bool {
        self.persisted
            && self
                .schema
                .columns()
                .iter()
                .zip(&self.values)
                .filter(|(col, _)| col.is_primary_key())
                .all(|(_, slot)| !slot.changed())
    }

    /// `true` when the table has clustering keys and all of them are null
    #[must_use]
    pub fn clustering_keys_all_null(&self) -> bool {
        let mut keys = self
            .schema
            .columns()
            .iter()
            .zip(&self.values)
            .filter(|(col, _)| col.is_clustering_key())
            .peekable();
        keys.peek().is_some() && keys.all(|(col, slot)| col.is_null(slot.value()))
    }

    /// Validate and coerce every column value in place.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for the first column that fails.
    pub fn validate(&mut self) -> Result<(), CqlError> {
        let schema = Arc::clone(&self.schema);
        for (col, slot) in schema.columns().iter().zip(self.values.iter_mut()) {
            let mut value = slot.value().clone();
            if value.is_null() && !slot.is_explicit() && col.has_default() {
                value = col.get_default();
            }
            if col.is_partition_key() && col.is_null(&value) {
                return Err(CqlError::Validation(format!("{} - None values are not allowed", col.name())));
            }
            slot.replace(col.validate(value)?);
        }
        Ok(())
    }

    /// Mark every slot as persisted
    pub fn set_persisted(&mut self) {
        for slot in &mut self.values {
            slot.reset_previous();
        }
        self.persisted = true;
    }

    /// Key value an update must preserve: the persisted one, or the current
    /// one for a record never written
    fn key_baseline(&self, name: &str) -> &Value {
        match self.field(name) {
            Some(slot) if self.persisted => slot.previous(),
            Some(slot) => slot.value(),
            None => &NULL,
        }
    }

    fn key_change_error(&self, name: &str) -> CqlError {
        CqlError::Validation(format!(
            "Cannot apply update to primary key '{name}' for {}",
            self.schema.table()
        ))
    }

    fn check_writable(&mut self, action: &str) -> Result<(), CqlError> {
        if self.schema.is_polymorphic_base() {
            return Err(CqlError::Model(format!("cannot {action} polymorphic base model")));
        }
        let schema = Arc::clone(&self.schema);
        if let (Some(column), Some(value)) = (schema.discriminator_column(), schema.discriminator_value()) {
            if self.value_of(column) != value {
                self.set(column, value.clone())?;
            }
        }
        Ok(())
    }

    /// Insert this record, or update it in place if already persisted.
    ///
    /// # Errors
    ///
    /// `Model` for a polymorphic base or IF NOT EXISTS on a counter table,
    /// `Validation` for invalid values; these are raised before any I/O.
    /// Batch targets may return `Configuration`; direct targets return
    /// driver and conditional errors.
    pub async fn save<'t>(&mut self, target: impl Into<Target<'t>>, options: &WriteOptions) -> Result<(), CqlError> {
        self.check_writable("save")?;
        if options.if_not_exists && self.schema.has_counter() {
            return Err(CqlError::Model("IF NOT EXISTS cannot be used with counter columns".to_string()));
        }
        self.validate()?;
        DmlQuery::new(Arc::clone(&self.schema), target.into(), options)?
            .save(self)
            .await?;
        self.set_persisted();
        Ok(())
    }

    /// Assign `values` and write the changed columns.
    ///
    /// Every name is checked, and primary-key columns must keep their
    /// persisted value (after type coercion), before anything is assigned.
    /// A key already changed through [`Record::set`] is rejected too. A null
    /// value deletes the column.
    ///
    /// # Errors
    ///
    /// `Validation` for unknown columns or a primary-key change, raised
    /// without any I/O; otherwise as for [`Record::save`].
    pub async fn update<'t>(
        &mut self,
        target: impl Into<Target<'t>>,
        options: &WriteOptions,
        values: Vec<(&str, Value)>,
    ) -> Result<(), CqlError> {
        for (name, value) in &values {
            let col = self.schema.column_or_err(name)?;
            if col.is_primary_key() && col.validate(value.clone())? != *self.key_baseline(name) {
                return Err(self.key_change_error(name));
            }
        }
        if self.persisted {
            for (col, slot) in self.schema.columns().iter().zip(&self.values) {
                if col.is_primary_key()
                    && slot.is_explicit()
                    && col.validate(slot.value().clone())? != *slot.previous()
                {
                    return Err(self.key_change_error(col.name()));
                }
            }
        }
        for (name, value) in values {
            self.set(name, value)?;
        }

        self.check_writable("update")?;
        self.validate()?;
        DmlQuery::new(Arc::clone(&self.schema), target.into(), options)?
            .update(self)
            .await?;
        self.set_persisted();
        Ok(())
    }

    /// Delete this record's row.
    ///
    /// # Errors
    ///
    /// Batch targets may return `Configuration`; direct targets return
    /// driver and conditional errors.
    pub async fn delete<'t>(&self, target: impl Into<Target<'t>>, options: &WriteOptions) -> Result<(), CqlError> {
        DmlQuery::new(Arc::clone(&self.schema), target.into(), options)?
            .delete(self)
            .await
    }
}
