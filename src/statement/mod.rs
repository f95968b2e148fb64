//! CQL statement compiler output.
//!
//! Statements are plain data: target table, assignments, predicates and
//! write options. Rendering produces CQL text with named bind markers
//! `:p0`, `:p1`, ... and pushes the matching values into a shared
//! [`RenderContext`]. A batch renders all of its statements through one
//! context, so parameter slots never collide across the envelope.

pub mod clause;
pub mod select;
pub mod write;

pub use clause::{AssignOp, Assignment, Operator, Predicate};
pub use select::SelectStatement;
pub use write::{DeleteStatement, InsertStatement, UpdateStatement};

use crate::executor::Request;
use crate::value::Value;

/// Parameter slots shared by every statement rendered into one request
#[derive(Debug, Default)]
pub struct RenderContext {
    params: Vec<Value>,
}

impl RenderContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a value and return its bind marker
    pub fn bind(&mut self, value: Value) -> String {
        let marker = format!(":p{}", self.params.len());
        self.params.push(value);
        marker
    }

    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    #[must_use]
    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// Quote a column identifier
pub(crate) fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `USING TTL n AND TIMESTAMP t`, or empty
pub(crate) fn using_clause(ttl: Option<i32>, timestamp: Option<i64>) -> Option<String> {
    let mut options = Vec::new();
    if let Some(ttl) = ttl {
        options.push(format!("TTL {ttl}"));
    }
    if let Some(ts) = timestamp {
        options.push(format!("TIMESTAMP {ts}"));
    }
    if options.is_empty() {
        None
    } else {
        Some(format!("USING {}", options.join(" AND ")))
    }
}

/// A compiled write
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    /// Render into `ctx`, returning the CQL text
    pub fn render(&self, ctx: &mut RenderContext) -> String {
        match self {
            Statement::Insert(s) => s.render(ctx),
            Statement::Update(s) => s.render(ctx),
            Statement::Delete(s) => s.render(ctx),
        }
    }

    /// Render on its own into a driver request
    #[must_use]
    pub fn to_request(&self) -> Request {
        let mut ctx = RenderContext::new();
        let cql = self.render(&mut ctx);
        Request::new(cql, ctx.into_params())
    }

    /// Carries IF NOT EXISTS, IF EXISTS or IF predicates
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        match self {
            Statement::Insert(s) => s.if_not_exists,
            Statement::Update(s) => s.if_exists || !s.conditionals.is_empty(),
            Statement::Delete(s) => s.if_exists || !s.conditionals.is_empty(),
        }
    }

    /// Value bound to each of `keys` by equality, in order
    #[must_use]
    pub fn partition_key_values(&self, keys: &[&str]) -> Vec<Option<Value>> {
        keys.iter()
            .map(|key| match self {
                Statement::Insert(s) => s
                    .assignments
                    .iter()
                    .find(|(field, _)| field == key)
                    .map(|(_, v)| v.clone()),
                Statement::Update(s) => eq_value(&s.wheres, key),
                Statement::Delete(s) => eq_value(&s.wheres, key),
            })
            .collect()
    }
}

pub(crate) fn eq_value(wheres: &[Predicate], key: &str) -> Option<Value> {
    wheres
        .iter()
        .find(|p| p.field == key && p.op == Operator::Eq)
        .map(|p| p.value.clone())
}

impl From<InsertStatement> for Statement {
    fn from(s: InsertStatement) -> Self {
        Statement::Insert(s)
    }
}

impl From<UpdateStatement> for Statement {
    fn from(s: UpdateStatement) -> Self {
        Statement::Update(s)
    }
}

impl From<DeleteStatement> for Statement {
    fn from(s: DeleteStatement) -> Self {
        Statement::Delete(s)
    }
}
