//! Distinct-aware result row
//!
//! Merged result sets deduplicate DISTINCT rows in memory across targets.
//! `QueryRow` is the set element: equality and hashing run over the declared
//! distinct column subset only, or the whole row when no subset is declared.

use crate::types::Value;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct QueryRow {
    row_data: Vec<Value>,
    /// 1-based column indexes the distinct comparison is restricted to.
    distinct_column_indexes: Vec<usize>,
}

impl QueryRow {
    pub fn new(row_data: Vec<Value>) -> Self {
        QueryRow {
            row_data,
            distinct_column_indexes: Vec::new(),
        }
    }

    pub fn with_distinct(row_data: Vec<Value>, distinct_column_indexes: Vec<usize>) -> Self {
        QueryRow {
            row_data,
            distinct_column_indexes,
        }
    }

    /// The value in the given 1-based column.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.row_data.get(index.checked_sub(1)?)
    }

    pub fn row_data(&self) -> &[Value] {
        &self.row_data
    }

    fn compared_values(&self) -> Vec<&Value> {
        if self.distinct_column_indexes.is_empty() {
            return self.row_data.iter().collect();
        }
        self.distinct_column_indexes
            .iter()
            .filter_map(|index| self.value(*index))
            .collect()
    }
}

impl PartialEq for QueryRow {
    fn eq(&self, other: &Self) -> bool {
        self.compared_values() == other.compared_values()
    }
}

impl Eq for QueryRow {}

impl Hash for QueryRow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in self.compared_values() {
            hash_value(value, state);
        }
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(v) => v.hash(state),
        Value::I32(v) => v.hash(state),
        Value::I64(v) => v.hash(state),
        Value::F64(v) => v.to_bits().hash(state),
        Value::Decimal(v) => v.hash(state),
        Value::Str(v) => v.hash(state),
        Value::Date(v) => v.hash(state),
        Value::Timestamp(v) => v.hash(state),
        Value::Uuid(v) => v.hash(state),
        Value::Bytes(v) => v.hash(state),
    }
}
