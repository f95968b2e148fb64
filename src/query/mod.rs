//! Deferred, filterable collections of records.
//!
//! A [`QuerySet`] is built with chained, consuming calls and does no I/O
//! until one of its async operations runs:
//!
//! - `all` fetches every page into the result cache
//! - `get` fetches until it can tell zero, one, or several rows matched
//! - `update` writes through an UPDATE (and a DELETE for nulled columns)
//! - `create` builds and saves one record with the queryset's write options
//! - `iterate` returns [`Pages`], one server page per step
//!
//! Filter names use `column` or `column__op` (`eq`, `in`, `gt`, `gte`, `lt`,
//! `lte`). Update names use `column` or `column__op` (`add`, `remove`,
//! `append`, `prepend`, `update`).

pub mod execution;
pub mod paginator;

pub use paginator::Pages;

use crate::active_model::Record;
use crate::dml::{WriteOptions, WriteTimestamp};
use crate::error::CqlError;
use crate::executor::Consistency;
use crate::model::TableSchema;
use crate::statement::{Operator, Predicate, SelectStatement};
use crate::value::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct QuerySet {
    schema: Arc<TableSchema>,
    wheres: Vec<Predicate>,
    fields: Vec<String>,
    limit: Option<usize>,
    fetch_size: Option<i32>,
    allow_filtering: bool,
    options: WriteOptions,
    result_cache: Option<Vec<Record>>,
}

impl QuerySet {
    #[must_use]
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self {
            schema,
            wheres: Vec::new(),
            fields: Vec::new(),
            limit: None,
            fetch_size: None,
            allow_filtering: false,
            options: WriteOptions::default(),
            result_cache: None,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Add a filter such as `("age__gte", 18)`.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for an unknown column or operator, a
    /// null value, an `in` value that is not a list, or a value of the
    /// wrong type.
    pub fn filter(mut self, name: &str, value: impl Into<Value>) -> Result<Self, CqlError> {
        let (column, op) = match name.rsplit_once("__") {
            Some((column, suffix)) if self.schema.column(column).is_some() => (column, Operator::parse(suffix)?),
            _ => (name, Operator::Eq),
        };
        let col = self.schema.column_or_err(column)?;
        let value = value.into();
        if value.is_null() {
            return Err(CqlError::Validation(format!("{column}: None values are not allowed in filters")));
        }
        let value = match (op, value) {
            (Operator::In, Value::List(items) | Value::Set(items)) => Value::List(
                items
                    .into_iter()
                    .map(|item| col.validate(item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (Operator::In, other) => {
                return Err(CqlError::Validation(format!(
                    "{column}: IN filters need a list of values, got {other}"
                )))
            }
            (_, value) => col.validate(value)?,
        };
        let predicate = Predicate::new(col.db_field_name(), op, value);
        self.wheres.push(predicate);
        self.result_cache = None;
        Ok(self)
    }

    /// Add several filters; see [`QuerySet::filter`].
    ///
    /// # Errors
    ///
    /// The first filter error.
    pub fn filter_many(mut self, filters: Vec<(&str, Value)>) -> Result<Self, CqlError> {
        for (name, value) in filters {
            self = self.filter(name, value)?;
        }
        Ok(self)
    }

    /// Project only `fields`.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for an unknown column.
    pub fn only(mut self, fields: &[&str]) -> Result<Self, CqlError> {
        self.fields = fields
            .iter()
            .map(|name| self.schema.column_or_err(name).map(|c| c.db_field_name().to_string()))
            .collect::<Result<_, _>>()?;
        self.result_cache = None;
        Ok(self)
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rows per server page; defaults to the connection's `fetch_size`
    #[must_use]
    pub fn fetch_size(mut self, fetch_size: i32) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }

    #[must_use]
    pub fn allow_filtering(mut self) -> Self {
        self.allow_filtering = true;
        self
    }

    /// Add an `IF column = value` condition to writes
    #[must_use]
    pub fn iff(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options = self.options.iff(column, value);
        self
    }

    #[must_use]
    pub fn if_exists(mut self) -> Self {
        self.options = self.options.if_exists();
        self
    }

    #[must_use]
    pub fn if_not_exists(mut self) -> Self {
        self.options = self.options.if_not_exists();
        self
    }

    #[must_use]
    pub fn ttl(mut self, seconds: i32) -> Self {
        self.options = self.options.ttl(seconds);
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: impl Into<WriteTimestamp>) -> Self {
        self.options = self.options.timestamp(timestamp);
        self
    }

    #[must_use]
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.options = self.options.consistency(consistency);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.timeout(timeout);
        self
    }

    /// Run on the named connection instead of the model's
    #[must_use]
    pub fn using(mut self, connection: impl Into<String>) -> Self {
        self.options = self.options.using(connection);
        self
    }

    #[must_use]
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Filters plus the discriminator predicate of a polymorphic variant
    fn where_clause(&self) -> Vec<Predicate> {
        let mut wheres = self.wheres.clone();
        if let (Some(column), Some(value)) = (self.schema.discriminator_column(), self.schema.discriminator_value()) {
            let field = self.schema.column(column).map_or(column, |c| c.db_field_name());
            if !wheres.iter().any(|p| p.field == field) {
                wheres.push(Predicate::eq(field, value.clone()));
            }
        }
        wheres
    }

    pub(crate) fn select_statement(&self) -> SelectStatement {
        let mut select = SelectStatement::new(self.schema.column_family_name());
        select.fields = self.fields.clone();
        select.wheres = self.where_clause();
        select.limit = self.limit;
        select.allow_filtering = self.allow_filtering;
        select
    }

    /// Whether `all` has filled the result cache
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.result_cache.is_some()
    }

    /// Cached records; empty until materialized
    #[must_use]
    pub fn records(&self) -> &[Record] {
        self.result_cache.as_deref().unwrap_or(&[])
    }

    #[must_use]
    pub fn nth(&self, idx: usize) -> Option<&Record> {
        self.records().get(idx)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Record> {
        self.nth(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records().iter()
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.result_cache.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDef, ColumnType};
    use crate::statement::RenderContext;

    fn users() -> Arc<TableSchema> {
        TableSchema::builder("app", "users")
            .column(ColumnDef::new("id", ColumnType::Int).partition_key())
            .column(ColumnDef::new("age", ColumnType::BigInt))
            .column(ColumnDef::new("name", ColumnType::Text).db_field("n"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_filter_operators_and_coercion() {
        let qs = QuerySet::new(users())
            .filter("id", 1)
            .unwrap()
            .filter("age__gte", 18)
            .unwrap()
            .allow_filtering()
            .limit(5);
        let select = qs.select_statement();
        let mut ctx = RenderContext::new();
        assert_eq!(
            select.render(&mut ctx),
            "SELECT * FROM app.users WHERE \"id\" = :p0 AND \"age\" >= :p1 LIMIT 5 ALLOW FILTERING"
        );
        assert_eq!(ctx.into_params(), vec![Value::Int(1), Value::BigInt(18)]);
    }

    #[test]
    fn test_filter_rejects_unknown_names() {
        assert!(QuerySet::new(users()).filter("email", "x").is_err());
        assert!(QuerySet::new(users()).filter("age__like", 1).is_err());
        assert!(QuerySet::new(users()).filter("id__in", 1).is_err());
        assert!(QuerySet::new(users()).filter("id", Value::Null).is_err());
    }

    #[test]
    fn test_only_uses_db_field() {
        let qs = QuerySet::new(users()).only(&["name"]).unwrap();
        assert_eq!(qs.select_statement().fields, vec!["n".to_string()]);
        assert!(QuerySet::new(users()).only(&["nope"]).is_err());
    }

    #[test]
    fn test_in_filter_binds_list() {
        let qs = QuerySet::new(users())
            .filter("id__in", Value::List(vec![Value::Int(1), Value::Int(2)]))
            .unwrap();
        let select = qs.select_statement();
        assert_eq!(select.wheres[0].op, Operator::In);
        assert!(!qs.is_materialized());
        assert!(qs.is_empty());
    }
}
