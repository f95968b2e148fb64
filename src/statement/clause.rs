//! WHERE / IF predicates and SET assignments.

use crate::error::CqlError;
use crate::statement::{quote, RenderContext};
use crate::value::Value;
use std::fmt;

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Parse a filter suffix such as `gte` from `age__gte`.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for an unknown suffix.
    pub fn parse(suffix: &str) -> Result<Self, CqlError> {
        match suffix {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "in" => Ok(Operator::In),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            other => Err(CqlError::Validation(format!("{other} is not a valid filter operator"))),
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::In => "IN",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `"field" <op> :pN`, used both in WHERE and in IF clauses
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Column name as stored in the table
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub(crate) fn render(&self, ctx: &mut RenderContext) -> String {
        let marker = ctx.bind(self.value.clone());
        format!("{} {} {marker}", quote(&self.field), self.op)
    }
}

pub(crate) fn render_predicates(predicates: &[Predicate], ctx: &mut RenderContext) -> String {
    predicates
        .iter()
        .map(|p| p.render(ctx))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Operation applied by a SET assignment
#[derive(Debug, Clone, PartialEq)]
pub enum AssignOp {
    Set,
    /// Set or map union
    Add,
    /// Set difference, list removal, or map key removal
    Remove,
    Append,
    Prepend,
    /// Map merge
    Update,
    /// Counter increment from `previous` to the assigned value
    Counter { previous: Value },
}

impl AssignOp {
    /// Parse an update suffix such as `append` from `tags__append`.
    ///
    /// # Errors
    ///
    /// Returns `CqlError::Validation` for an unknown suffix.
    pub fn parse(suffix: &str) -> Result<Self, CqlError> {
        match suffix {
            "add" => Ok(AssignOp::Add),
            "remove" => Ok(AssignOp::Remove),
            "append" => Ok(AssignOp::Append),
            "prepend" => Ok(AssignOp::Prepend),
            "update" => Ok(AssignOp::Update),
            other => Err(CqlError::Validation(format!("{other} is not a valid update operation"))),
        }
    }
}

/// One SET item of an UPDATE
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: String,
    pub op: AssignOp,
    pub value: Value,
}

impl Assignment {
    pub fn new(field: impl Into<String>, op: AssignOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub(crate) fn render(&self, ctx: &mut RenderContext) -> String {
        let field = quote(&self.field);
        match &self.op {
            AssignOp::Set => format!("{field} = {}", ctx.bind(self.value.clone())),
            AssignOp::Add | AssignOp::Append | AssignOp::Update => {
                format!("{field} = {field} + {}", ctx.bind(self.value.clone()))
            }
            AssignOp::Remove => format!("{field} = {field} - {}", ctx.bind(self.value.clone())),
            AssignOp::Prepend => format!("{field} = {} + {field}", ctx.bind(self.value.clone())),
            AssignOp::Counter { previous } => {
                let current = self.value.as_i64().unwrap_or(0);
                let before = previous.as_i64().unwrap_or(0);
                let delta = current.saturating_sub(before);
                let sign = if delta < 0 { '-' } else { '+' };
                let marker = ctx.bind(Value::BigInt(delta.saturating_abs()));
                format!("{field} = {field} {sign} {marker}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_render() {
        let mut ctx = RenderContext::new();
        let p = Predicate::new("age", Operator::Gte, Value::Int(18));
        assert_eq!(p.render(&mut ctx), "\"age\" >= :p0");
        assert_eq!(ctx.params(), &[Value::Int(18)]);
    }

    #[test]
    fn test_counter_assignment_renders_delta() {
        let mut ctx = RenderContext::new();
        let up = Assignment::new("hits", AssignOp::Counter { previous: Value::BigInt(5) }, Value::BigInt(8));
        assert_eq!(up.render(&mut ctx), "\"hits\" = \"hits\" + :p0");
        let down = Assignment::new("hits", AssignOp::Counter { previous: Value::BigInt(5) }, Value::BigInt(2));
        assert_eq!(down.render(&mut ctx), "\"hits\" = \"hits\" - :p1");
        assert_eq!(ctx.params(), &[Value::BigInt(3), Value::BigInt(3)]);
    }

    #[test]
    fn test_collection_assignments() {
        let mut ctx = RenderContext::new();
        let v = Value::List(vec![Value::Int(1)]);
        assert_eq!(
            Assignment::new("l", AssignOp::Prepend, v.clone()).render(&mut ctx),
            "\"l\" = :p0 + \"l\""
        );
        assert_eq!(Assignment::new("l", AssignOp::Remove, v).render(&mut ctx), "\"l\" = \"l\" - :p1");
    }

    #[test]
    fn test_unknown_operators_rejected() {
        assert!(Operator::parse("like").is_err());
        assert!(AssignOp::parse("pop").is_err());
        assert_eq!(Operator::parse("in").unwrap(), Operator::In);
    }
}
