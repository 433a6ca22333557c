//! Optimized statement model
//!
//! Normalizes a parsed statement into the view routing and rewriting work
//! from: the referenced tables plus kind-specific attributes. The attribute
//! enum is closed, so a statement carries SELECT attributes or INSERT
//! attributes, never both.

pub mod encrypt;
pub mod insert;
pub mod select;

pub use encrypt::{EncryptCondition, EncryptConditions};
pub use insert::{GeneratedKey, InsertAttributes};
pub use select::{AggregationItem, OrderByItem, Pagination, PaginationValue, SelectAttributes, SelectItems};

use crate::error::Result;
use crate::rule::ShardingRule;
use crate::statement::{SqlStatement, StatementKind};
use crate::types::Value;

/// Referenced logical table names, de-duplicated in reference order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tables {
    names: Vec<String>,
}

impl Tables {
    pub fn new(names: Vec<String>) -> Self {
        Tables { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The sole referenced table, when exactly one is referenced.
    pub fn single_table_name(&self) -> Option<&str> {
        match self.names.as_slice() {
            [single] => Some(single.as_str()),
            _ => None,
        }
    }
}

/// Kind-specific extension of the optimized statement.
#[derive(Debug, Clone)]
pub enum StatementAttributes {
    Select(SelectAttributes),
    Insert(InsertAttributes),
    Other,
}

/// The normalized statement view consumed by routing and rewriting.
#[derive(Debug, Clone)]
pub struct OptimizedStatement {
    pub tables: Tables,
    pub attributes: StatementAttributes,
}

impl OptimizedStatement {
    pub fn optimize(
        rule: &ShardingRule,
        statement: &SqlStatement,
        parameters: &[Value],
    ) -> Result<Self> {
        let tables = Tables::new(statement.table_names());
        let attributes = match statement.kind {
            StatementKind::Select => match &statement.select {
                Some(select) => {
                    StatementAttributes::Select(SelectAttributes::new(select, parameters)?)
                }
                None => StatementAttributes::Other,
            },
            StatementKind::Insert => match &statement.insert {
                Some(insert) => StatementAttributes::Insert(InsertAttributes::new(
                    rule,
                    insert,
                    tables.single_table_name().unwrap_or_default(),
                    parameters,
                )?),
                None => StatementAttributes::Other,
            },
            _ => StatementAttributes::Other,
        };
        Ok(OptimizedStatement { tables, attributes })
    }

    pub fn select(&self) -> Option<&SelectAttributes> {
        match &self.attributes {
            StatementAttributes::Select(select) => Some(select),
            _ => None,
        }
    }

    pub fn select_mut(&mut self) -> Option<&mut SelectAttributes> {
        match &mut self.attributes {
            StatementAttributes::Select(select) => Some(select),
            _ => None,
        }
    }

    pub fn insert(&self) -> Option<&InsertAttributes> {
        match &self.attributes {
            StatementAttributes::Insert(insert) => Some(insert),
            _ => None,
        }
    }

    pub fn generated_key(&self) -> Option<&GeneratedKey> {
        self.insert().and_then(|insert| insert.generated_key.as_ref())
    }
}
