//! INSERT, UPDATE and DELETE statements.

use crate::statement::clause::{render_predicates, Assignment, Predicate};
use crate::statement::{quote, using_clause, RenderContext};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertStatement {
    /// `keyspace.table`
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub ttl: Option<i32>,
    /// Write timestamp in microseconds
    pub timestamp: Option<i64>,
    pub if_not_exists: bool,
}

impl InsertStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn add_assignment(&mut self, field: impl Into<String>, value: Value) {
        self.assignments.push((field.into(), value));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn render(&self, ctx: &mut RenderContext) -> String {
        let fields: Vec<String> = self.assignments.iter().map(|(f, _)| quote(f)).collect();
        let markers: Vec<String> = self.assignments.iter().map(|(_, v)| ctx.bind(v.clone())).collect();
        let mut parts = vec![format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            fields.join(", "),
            markers.join(", ")
        )];
        if self.if_not_exists {
            parts.push("IF NOT EXISTS".to_string());
        }
        if let Some(using) = using_clause(self.ttl, self.timestamp) {
            parts.push(using);
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub wheres: Vec<Predicate>,
    pub conditionals: Vec<Predicate>,
    pub ttl: Option<i32>,
    pub timestamp: Option<i64>,
    pub if_exists: bool,
}

impl UpdateStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    pub fn add_where(&mut self, predicate: Predicate) {
        self.wheres.push(predicate);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn render(&self, ctx: &mut RenderContext) -> String {
        let mut parts = vec![format!("UPDATE {}", self.table)];
        if let Some(using) = using_clause(self.ttl, self.timestamp) {
            parts.push(using);
        }
        let sets: Vec<String> = self.assignments.iter().map(|a| a.render(ctx)).collect();
        parts.push(format!("SET {}", sets.join(", ")));
        if !self.wheres.is_empty() {
            parts.push(format!("WHERE {}", render_predicates(&self.wheres, ctx)));
        }
        push_conditions(&mut parts, &self.conditionals, self.if_exists, ctx);
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteStatement {
    pub table: String,
    /// Columns to delete; empty deletes the whole row
    pub fields: Vec<String>,
    pub wheres: Vec<Predicate>,
    pub conditionals: Vec<Predicate>,
    pub timestamp: Option<i64>,
    pub if_exists: bool,
}

impl DeleteStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn add_field(&mut self, field: impl Into<String>) {
        self.fields.push(field.into());
    }

    pub fn add_where(&mut self, predicate: Predicate) {
        self.wheres.push(predicate);
    }

    pub fn render(&self, ctx: &mut RenderContext) -> String {
        let mut parts = vec!["DELETE".to_string()];
        if !self.fields.is_empty() {
            parts.push(self.fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join(", "));
        }
        parts.push(format!("FROM {}", self.table));
        if let Some(ts) = self.timestamp {
            parts.push(format!("USING TIMESTAMP {ts}"));
        }
        if !self.wheres.is_empty() {
            parts.push(format!("WHERE {}", render_predicates(&self.wheres, ctx)));
        }
        push_conditions(&mut parts, &self.conditionals, self.if_exists, ctx);
        parts.join(" ")
    }
}

fn push_conditions(parts: &mut Vec<String>, conditionals: &[Predicate], if_exists: bool, ctx: &mut RenderContext) {
    if !conditionals.is_empty() {
        parts.push(format!("IF {}", render_predicates(conditionals, ctx)));
    } else if if_exists {
        parts.push("IF EXISTS".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::clause::AssignOp;

    #[test]
    fn test_insert_render() {
        let mut insert = InsertStatement::new("ks.users");
        insert.add_assignment("id", Value::Int(1));
        insert.add_assignment("name", Value::from("ann"));
        insert.if_not_exists = true;
        insert.ttl = Some(30);
        let mut ctx = RenderContext::new();
        assert_eq!(
            insert.render(&mut ctx),
            "INSERT INTO ks.users (\"id\", \"name\") VALUES (:p0, :p1) IF NOT EXISTS USING TTL 30"
        );
        assert_eq!(ctx.params().len(), 2);
    }

    #[test]
    fn test_update_render_orders_params() {
        let mut update = UpdateStatement::new("ks.users");
        update.add_assignment(Assignment::new("name", AssignOp::Set, Value::from("bob")));
        update.add_where(Predicate::eq("id", Value::Int(1)));
        update.conditionals.push(Predicate::eq("name", Value::from("ann")));
        update.timestamp = Some(1000);
        let mut ctx = RenderContext::new();
        assert_eq!(
            update.render(&mut ctx),
            "UPDATE ks.users USING TIMESTAMP 1000 SET \"name\" = :p0 WHERE \"id\" = :p1 IF \"name\" = :p2"
        );
        assert_eq!(ctx.into_params(), vec![Value::from("bob"), Value::Int(1), Value::from("ann")]);
    }

    #[test]
    fn test_delete_columns_and_row() {
        let mut delete = DeleteStatement::new("ks.users");
        delete.add_field("name");
        delete.add_where(Predicate::eq("id", Value::Int(1)));
        delete.if_exists = true;
        let mut ctx = RenderContext::new();
        assert_eq!(
            delete.render(&mut ctx),
            "DELETE \"name\" FROM ks.users WHERE \"id\" = :p0 IF EXISTS"
        );

        let mut row = DeleteStatement::new("ks.users");
        row.add_where(Predicate::eq("id", Value::Int(1)));
        assert_eq!(row.render(&mut RenderContext::new()), "DELETE FROM ks.users WHERE \"id\" = :p0");
    }
}
