//! SELECT statements issued by querysets.

use crate::statement::clause::{render_predicates, Predicate};
use crate::statement::{eq_value, quote, RenderContext};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub table: String,
    /// Projected columns; empty selects `*`
    pub fields: Vec<String>,
    pub wheres: Vec<Predicate>,
    pub limit: Option<usize>,
    pub allow_filtering: bool,
}

impl SelectStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Value bound to each of `keys` by equality, in order
    #[must_use]
    pub fn partition_key_values(&self, keys: &[&str]) -> Vec<Option<Value>> {
        keys.iter().map(|key| eq_value(&self.wheres, key)).collect()
    }

    pub fn render(&self, ctx: &mut RenderContext) -> String {
        let fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join(", ")
        };
        let mut parts = vec![format!("SELECT {fields} FROM {}", self.table)];
        if !self.wheres.is_empty() {
            parts.push(format!("WHERE {}", render_predicates(&self.wheres, ctx)));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT {limit}"));
        }
        if self.allow_filtering {
            parts.push("ALLOW FILTERING".to_string());
        }
        parts.join(" ")
    }
}
