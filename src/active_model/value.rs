//! `FieldValue` slot for per-column change tracking.
//!
//! Every column of a [`Record`](crate::Record) owns one slot holding the
//! current value, the value last persisted (or loaded), and whether the
//! field was explicitly assigned. The statement compiler reads only these
//! slots when deciding what to write.

use crate::model::ColumnDef;
use crate::value::Value;

/// Tracked value of one column
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    value: Value,
    previous: Value,
    explicit: bool,
}

impl FieldValue {
    /// A slot for a new record.
    ///
    /// `explicit` is `true` when the caller supplied the value; a default
    /// filled in by the schema starts out implicit.
    #[must_use]
    pub fn new(value: Value, explicit: bool) -> Self {
        Self {
            value,
            previous: Value::Null,
            explicit,
        }
    }

    /// A slot for a value read back from the database
    #[must_use]
    pub fn loaded(value: Value) -> Self {
        Self {
            previous: value.clone(),
            value,
            explicit: false,
        }
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Value as of the last persist or load
    #[must_use]
    pub fn previous(&self) -> &Value {
        &self.previous
    }

    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Assign a new value and mark the slot explicit
    pub fn set(&mut self, value: Value) {
        self.value = value;
        self.explicit = true;
    }

    /// Replace the value without touching the explicit flag (validation coercion)
    pub(crate) fn replace(&mut self, value: Value) {
        self.value = value;
    }

    pub(crate) fn mark_explicit(&mut self) {
        self.explicit = true;
    }

    /// Explicitly assigned and different from the persisted value
    #[must_use]
    pub fn changed(&self) -> bool {
        self.explicit && self.value != self.previous
    }

    /// Whether persisting this slot deletes the column.
    ///
    /// A null value is a delete if it was explicitly assigned or if it
    /// replaced a non-null persisted value.
    #[must_use]
    pub fn deleted(&self, column: &ColumnDef) -> bool {
        column.is_null(&self.value) && (self.explicit || !column.is_null(&self.previous))
    }

    /// Record the current value as persisted
    pub fn reset_previous(&mut self) {
        self.previous = self.value.clone();
        self.explicit = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnType;

    #[test]
    fn test_changed_requires_explicit_and_difference() {
        let mut slot = FieldValue::loaded(Value::from("a"));
        assert!(!slot.changed());
        slot.set(Value::from("a"));
        assert!(!slot.changed());
        slot.set(Value::from("b"));
        assert!(slot.changed());
        slot.reset_previous();
        assert!(!slot.changed());
        assert_eq!(slot.previous(), &Value::from("b"));
    }

    #[test]
    fn test_default_slot_is_implicit() {
        let slot = FieldValue::new(Value::Int(0), false);
        assert!(!slot.is_explicit());
        assert!(!slot.changed());
    }

    #[test]
    fn test_deleted_on_nulling_persisted_value() {
        let col = ColumnDef::new("name", ColumnType::Text);
        let mut slot = FieldValue::loaded(Value::from("a"));
        assert!(!slot.deleted(&col));
        slot.set(Value::Null);
        assert!(slot.deleted(&col));

        let never = FieldValue::new(Value::Null, false);
        assert!(!never.deleted(&col));
    }

    #[test]
    fn test_empty_collection_counts_as_deleted() {
        let col = ColumnDef::new("tags", ColumnType::set(ColumnType::Text));
        let mut slot = FieldValue::loaded(Value::Set(vec![Value::from("x")]));
        slot.set(Value::Set(vec![]));
        assert!(slot.deleted(&col));
    }
}
