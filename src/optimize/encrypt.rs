//! Encrypt condition extraction
//!
//! Predicates touching an encrypted logical column are lifted into
//! `EncryptCondition`s for the rewrite phase; routing never sees them.
//! Only `=` and `IN` are expressible against cipher/assisted columns —
//! anything else over an encrypted column is a configuration defect.

use crate::error::{Error, Result};
use crate::rule::EncryptRule;
use crate::statement::{
    ExpressionSegment, PredicateOperator, PredicateSegment, Span, SqlStatement,
};
use crate::types::Value;
use std::collections::BTreeMap;

/// One predicate over an encrypted column, anchored to the original text.
///
/// Value positions are indexes within the predicate's own value list;
/// `position_value_map` carries inlined literals and `position_index_map`
/// points parameter-marker positions at the bound parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptCondition {
    pub table: String,
    pub column: String,
    pub operator: PredicateOperator,
    pub span: Span,
    pub position_value_map: BTreeMap<usize, Value>,
    pub position_index_map: BTreeMap<usize, usize>,
}

impl EncryptCondition {
    /// The condition's values in position order, markers resolved against
    /// the bound parameters.
    pub fn values(&self, parameters: &[Value]) -> Result<Vec<Value>> {
        let count = self.position_value_map.len() + self.position_index_map.len();
        let mut result = vec![Value::Null; count];
        for (position, value) in &self.position_value_map {
            result[*position] = value.clone();
        }
        for (position, parameter_index) in &self.position_index_map {
            let value = parameters
                .get(*parameter_index)
                .ok_or(Error::ParameterIndexOutOfRange(*parameter_index))?;
            result[*position] = value.clone();
        }
        Ok(result)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncryptConditions {
    pub conditions: Vec<EncryptCondition>,
}

impl EncryptConditions {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Scans the statement's predicates for encrypted logical columns.
    pub fn extract(rule: &EncryptRule, statement: &SqlStatement) -> Result<Self> {
        let mut conditions = Vec::new();
        for predicate in &statement.predicates {
            let Some(table) = Self::owning_table(rule, statement, predicate) else {
                continue;
            };
            match predicate.operator {
                PredicateOperator::Equal | PredicateOperator::In => {}
                other => return Err(Error::UnsupportedEncryptOperator(other.to_string())),
            }
            let mut position_value_map = BTreeMap::new();
            let mut position_index_map = BTreeMap::new();
            for (position, value) in predicate.values.iter().enumerate() {
                match value {
                    ExpressionSegment::Literal(value) => {
                        position_value_map.insert(position, value.clone());
                    }
                    ExpressionSegment::Parameter(index) => {
                        position_index_map.insert(position, *index);
                    }
                }
            }
            conditions.push(EncryptCondition {
                table,
                column: predicate.column.name.clone(),
                operator: predicate.operator,
                span: predicate.span,
                position_value_map,
                position_index_map,
            });
        }
        Ok(EncryptConditions { conditions })
    }

    /// The table the predicate column belongs to, provided that table has
    /// the column configured as an encrypted logical column.
    fn owning_table(
        rule: &EncryptRule,
        statement: &SqlStatement,
        predicate: &PredicateSegment,
    ) -> Option<String> {
        let column = &predicate.column;
        if let Some(owner) = &column.owner {
            return statement
                .tables
                .iter()
                .find(|table| {
                    table.name.eq_ignore_ascii_case(owner)
                        || table.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(owner))
                })
                .filter(|table| rule.is_encrypt_column(&table.name, &column.name))
                .map(|table| table.name.clone());
        }
        statement
            .tables
            .iter()
            .find(|table| rule.is_encrypt_column(&table.name, &column.name))
            .map(|table| table.name.clone())
    }
}
