//! Table schemas.
//!
//! A [`TableSchema`] is the runtime description of one model: keyspace,
//! table, ordered columns, and optional connection / consistency defaults.
//! Schemas are built once, validated, and shared behind an `Arc`; records,
//! querysets and compiled statements all read from it.
//!
//! Polymorphic models are a base schema carrying a discriminator column and
//! a registry of variants, each variant pinned to one discriminator value.

use crate::connection::Connections;
use crate::error::CqlError;
use crate::executor::Consistency;
use crate::model::column::{ColumnDef, ColumnType};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

static IDENTIFIER: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,48}$"));

/// Polymorphic role of a schema
#[derive(Debug)]
pub enum Polymorphic {
    /// Abstract base; reads materialize the registered variant
    Base {
        column: String,
        variants: RwLock<Vec<Arc<TableSchema>>>,
    },
    /// Concrete variant stamped with `value`
    Variant { column: String, value: Value },
}

/// Runtime model schema
#[derive(Debug)]
pub struct TableSchema {
    keyspace: String,
    table: String,
    columns: Vec<ColumnDef>,
    connection: Option<String>,
    consistency: Option<Consistency>,
    polymorphic: Option<Polymorphic>,
}

/// Builder for [`TableSchema`]
#[derive(Debug)]
pub struct TableSchemaBuilder {
    keyspace: String,
    table: String,
    columns: Vec<ColumnDef>,
    connection: Option<String>,
    consistency: Option<Consistency>,
    discriminator: Option<String>,
}

impl TableSchemaBuilder {
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Connection the model's statements run on unless overridden per call
    #[must_use]
    pub fn connection(mut self, name: impl Into<String>) -> Self {
        self.connection = Some(name.into());
        self
    }

    #[must_use]
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Make this schema a polymorphic base keyed on `column`
    #[must_use]
    pub fn discriminator(mut self, column: impl Into<String>) -> Self {
        self.discriminator = Some(column.into());
        self
    }

    /// Validate and freeze the schema.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Model` for an invalid identifier, a missing
    /// partition key, duplicate columns, static columns without clustering
    /// keys, counters mixed with data columns, or a bad discriminator.
    pub fn build(self) -> Result<Arc<TableSchema>, CqlError> {
        let polymorphic = match self.discriminator {
            Some(column) => Some(Polymorphic::Base {
                column,
                variants: RwLock::new(Vec::new()),
            }),
            None => None,
        };
        let schema = TableSchema {
            keyspace: self.keyspace,
            table: self.table,
            columns: self.columns,
            connection: self.connection,
            consistency: self.consistency,
            polymorphic,
        };
        schema.check()?;
        Ok(Arc::new(schema))
    }
}

impl TableSchema {
    pub fn builder(keyspace: impl Into<String>, table: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            keyspace: keyspace.into(),
            table: table.into(),
            columns: Vec::new(),
            connection: None,
            consistency: None,
            discriminator: None,
        }
    }

    fn check(&self) -> Result<(), CqlError> {
        let identifier = IDENTIFIER
            .as_ref()
            .map_err(|e| CqlError::Model(format!("Invalid regex: {e}")))?;
        for ident in [&self.keyspace, &self.table] {
            if !identifier.is_match(ident) {
                return Err(CqlError::Model(format!(
                    "'{ident}' is not a valid identifier (alphanumerics and underscores, at most 48 characters)"
                )));
            }
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name()) {
                return Err(CqlError::Model(format!("{} has duplicate column: {}", self.table, col.name())));
            }
        }

        if self.partition_keys().next().is_none() {
            return Err(CqlError::Model(format!("{} must define at least one partition key", self.table)));
        }

        let has_clustering = self.clustering_keys().next().is_some();
        if !has_clustering && self.columns.iter().any(ColumnDef::is_static) {
            return Err(CqlError::Model(format!(
                "{} has static columns but no clustering keys",
                self.table
            )));
        }

        if self.has_counter() {
            if let Some(col) = self.columns.iter().find(|c| c.is_counter() && c.is_primary_key()) {
                return Err(CqlError::Model(format!("counter column '{}' cannot be a primary key", col.name())));
            }
            if let Some(col) = self.columns.iter().find(|c| !c.is_counter() && !c.is_primary_key()) {
                return Err(CqlError::Model(format!(
                    "counter models may not have data columns: '{}'",
                    col.name()
                )));
            }
        }

        if let Some(column) = self.discriminator_column() {
            let col = self
                .column(column)
                .ok_or_else(|| CqlError::Model(format!("discriminator column '{column}' is not defined")))?;
            if col.is_partition_key() || col.is_counter() {
                return Err(CqlError::Model(format!(
                    "discriminator column '{column}' cannot be a partition key or counter"
                )));
            }
        }
        Ok(())
    }

    /// Register a concrete variant of this polymorphic base.
    ///
    /// The variant shares the base's table and columns plus `extra` ones.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Model` if this schema is not a polymorphic base, the
    /// discriminator value is null or already registered, or the combined
    /// columns fail validation.
    pub fn register_variant(
        self: &Arc<Self>,
        value: impl Into<Value>,
        extra: Vec<ColumnDef>,
    ) -> Result<Arc<TableSchema>, CqlError> {
        let value = value.into();
        let Some(Polymorphic::Base { column, variants }) = &self.polymorphic else {
            return Err(CqlError::Model(format!("{} is not a polymorphic base", self.table)));
        };
        if value.is_null() {
            return Err(CqlError::Model("discriminator value cannot be null".to_string()));
        }
        let value = self.column_or_err(column)?.validate(value).map_err(|e| CqlError::Model(e.to_string()))?;

        let mut columns = self.columns.clone();
        columns.extend(extra);
        let variant = TableSchema {
            keyspace: self.keyspace.clone(),
            table: self.table.clone(),
            columns,
            connection: self.connection.clone(),
            consistency: self.consistency,
            polymorphic: Some(Polymorphic::Variant {
                column: column.clone(),
                value: value.clone(),
            }),
        };
        variant.check()?;
        let variant = Arc::new(variant);

        let mut registry = variants.write().unwrap_or_else(PoisonError::into_inner);
        if registry.iter().any(|v| v.discriminator_value() == Some(&value)) {
            return Err(CqlError::Model(format!(
                "discriminator value {value} is already registered on {}",
                self.table
            )));
        }
        registry.push(Arc::clone(&variant));
        Ok(variant)
    }

    /// Variant registered for `value`, when this is a polymorphic base
    #[must_use]
    pub fn variant_for(&self, value: &Value) -> Option<Arc<TableSchema>> {
        match &self.polymorphic {
            Some(Polymorphic::Base { variants, .. }) => variants
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|v| v.discriminator_value() == Some(value))
                .cloned(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_polymorphic_base(&self) -> bool {
        matches!(self.polymorphic, Some(Polymorphic::Base { .. }))
    }

    #[must_use]
    pub fn discriminator_column(&self) -> Option<&str> {
        match &self.polymorphic {
            Some(Polymorphic::Base { column, .. } | Polymorphic::Variant { column, .. }) => Some(column),
            None => None,
        }
    }

    /// Discriminator value this variant stamps on save
    #[must_use]
    pub fn discriminator_value(&self) -> Option<&Value> {
        match &self.polymorphic {
            Some(Polymorphic::Variant { value, .. }) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// `keyspace.table`
    #[must_use]
    pub fn column_family_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.table)
    }

    #[must_use]
    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    #[must_use]
    pub fn consistency(&self) -> Option<Consistency> {
        self.consistency
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Column by name.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` naming the missing column.
    pub fn column_or_err(&self, name: &str) -> Result<&ColumnDef, CqlError> {
        self.column(name)
            .ok_or_else(|| CqlError::Validation(format!("{} has no column named: {name}", self.table)))
    }

    pub fn partition_keys(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.is_partition_key())
    }

    pub fn clustering_keys(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.is_clustering_key())
    }

    /// Partition keys followed by clustering keys, in declaration order
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnDef> {
        self.partition_keys().chain(self.clustering_keys())
    }

    #[must_use]
    pub fn has_counter(&self) -> bool {
        self.columns.iter().any(|c| *c.column_type() == ColumnType::Counter)
    }
}

/// Model-level entry points
impl TableSchema {
    /// A fresh queryset over this table
    #[must_use]
    pub fn objects(self: &Arc<Self>) -> crate::query::QuerySet {
        crate::query::QuerySet::new(Arc::clone(self))
    }

    /// Validate column names, build a record and save it.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for unknown columns before any I/O,
    /// otherwise whatever the save fails with.
    pub async fn create(
        self: &Arc<Self>,
        connections: &Connections,
        values: Vec<(&str, Value)>,
    ) -> Result<crate::Record, CqlError> {
        self.objects().create(connections, values).await
    }

    /// Materialize every row of the table.
    ///
    /// # Errors
    ///
    /// Returns driver errors from any page fetch.
    pub async fn all(self: &Arc<Self>, connections: &Connections) -> Result<crate::query::QuerySet, CqlError> {
        self.objects().all(connections).await
    }

    /// Fetch the single row matching `filters`.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` or `MultipleObjectsReturned` when the match is not unique.
    pub async fn get(
        self: &Arc<Self>,
        connections: &Connections,
        filters: Vec<(&str, Value)>,
    ) -> Result<crate::Record, CqlError> {
        self.objects().filter_many(filters)?.get(connections).await
    }

    /// Page-by-page iteration over the whole table.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for unknown projected fields.
    pub fn iterate<'a>(
        self: &Arc<Self>,
        connections: &'a Connections,
        fetch_size: i32,
        fields: &[&str],
        limit: Option<usize>,
    ) -> Result<crate::query::Pages<'a>, CqlError> {
        let mut qs = self.objects().fetch_size(fetch_size);
        if !fields.is_empty() {
            qs = qs.only(fields)?;
        }
        if let Some(limit) = limit {
            qs = qs.limit(limit);
        }
        Ok(qs.iterate(connections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Arc<TableSchema> {
        TableSchema::builder("app", "users")
            .column(ColumnDef::new("id", ColumnType::Uuid).partition_key())
            .column(ColumnDef::new("name", ColumnType::Text))
            .build()
            .unwrap()
    }

    #[test]
    fn test_primary_keys_order() {
        let schema = TableSchema::builder("app", "events")
            .column(ColumnDef::new("payload", ColumnType::Text))
            .column(ColumnDef::new("seq", ColumnType::Int).clustering_key())
            .column(ColumnDef::new("day", ColumnType::Text).partition_key())
            .build()
            .unwrap();
        let pks: Vec<&str> = schema.primary_keys().map(ColumnDef::name).collect();
        assert_eq!(pks, vec!["day", "seq"]);
        assert_eq!(schema.column_family_name(), "app.events");
    }

    #[test]
    fn test_schema_requires_partition_key() {
        let err = TableSchema::builder("app", "t")
            .column(ColumnDef::new("a", ColumnType::Int))
            .build()
            .unwrap_err();
        assert!(matches!(err, CqlError::Model(_)));
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let err = TableSchema::builder("app", "bad-name")
            .column(ColumnDef::new("a", ColumnType::Int).partition_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, CqlError::Model(_)));
    }

    #[test]
    fn test_counter_tables_reject_data_columns() {
        let err = TableSchema::builder("app", "hits")
            .column(ColumnDef::new("page", ColumnType::Text).partition_key())
            .column(ColumnDef::new("hits", ColumnType::Counter))
            .column(ColumnDef::new("title", ColumnType::Text))
            .build()
            .unwrap_err();
        assert!(matches!(err, CqlError::Model(_)));
    }

    #[test]
    fn test_static_requires_clustering_key() {
        let err = TableSchema::builder("app", "t")
            .column(ColumnDef::new("a", ColumnType::Int).partition_key())
            .column(ColumnDef::new("s", ColumnType::Text).static_column())
            .build()
            .unwrap_err();
        assert!(matches!(err, CqlError::Model(_)));
    }

    #[test]
    fn test_unknown_column_is_validation_error() {
        let err = users().column_or_err("email").unwrap_err();
        assert_eq!(err, CqlError::Validation("users has no column named: email".into()));
    }

    #[test]
    fn test_variant_registry() {
        let base = TableSchema::builder("app", "pets")
            .column(ColumnDef::new("id", ColumnType::Uuid).partition_key())
            .column(ColumnDef::new("kind", ColumnType::Text))
            .discriminator("kind")
            .build()
            .unwrap();
        let dog = base
            .register_variant("dog", vec![ColumnDef::new("bark", ColumnType::Text)])
            .unwrap();
        assert!(base.is_polymorphic_base());
        assert_eq!(dog.discriminator_value(), Some(&Value::from("dog")));
        assert!(base.variant_for(&Value::from("dog")).is_some());
        assert!(base.variant_for(&Value::from("cat")).is_none());
        assert!(base.register_variant("dog", vec![]).is_err());
        assert!(dog.register_variant("puppy", vec![]).is_err());
    }
}
