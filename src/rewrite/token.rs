//! Rewrite tokens
//!
//! A token is a span edit against the original SQL text: replace the span or
//! insert at a zero-width span. Tokens from all generators, once sorted by
//! start offset, never overlap; application is a single forward pass.

use crate::route::RoutingUnit;
use crate::statement::{PredicateOperator, Span};
use crate::types::Value;
use std::fmt::Write;

/// One value slot in a rewritten predicate: kept as a placeholder when the
/// original position was bound, inlined otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSlot {
    Placeholder,
    Literal(Value),
}

/// The closed set of span edits the rewrite engine can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlToken {
    /// Logical table name replaced by the routing unit's physical binding.
    Table { span: Span, logic_table: String },
    /// Generated key column name inserted at the end of an INSERT column
    /// list, closing the list when the original had none to close.
    InsertGeneratedKeyName {
        span: Span,
        column: String,
        close_paren: bool,
    },
    /// Projected encrypt column swapped for its cipher or plain equivalent.
    SelectEncryptItem {
        span: Span,
        owner: Option<String>,
        column: String,
    },
    /// Whole predicate over an encrypt column re-rendered against the
    /// cipher/assisted/plain column.
    WhereEncryptColumn {
        span: Span,
        column: String,
        operator: PredicateOperator,
        values: Vec<ValueSlot>,
    },
}

impl SqlToken {
    pub fn span(&self) -> Span {
        match self {
            SqlToken::Table { span, .. }
            | SqlToken::InsertGeneratedKeyName { span, .. }
            | SqlToken::SelectEncryptItem { span, .. }
            | SqlToken::WhereEncryptColumn { span, .. } => *span,
        }
    }

    /// The text substituted for this token's span.
    pub fn render(&self, routing_unit: Option<&RoutingUnit>) -> String {
        match self {
            SqlToken::Table { logic_table, .. } => routing_unit
                .and_then(|unit| unit.actual_table(logic_table))
                .unwrap_or(logic_table)
                .to_owned(),
            SqlToken::InsertGeneratedKeyName { column, close_paren, .. } => {
                if *close_paren {
                    format!(", {column})")
                } else {
                    format!(", {column}")
                }
            }
            SqlToken::SelectEncryptItem { owner, column, .. } => match owner {
                Some(owner) => format!("{owner}.{column}"),
                None => column.clone(),
            },
            SqlToken::WhereEncryptColumn {
                column,
                operator,
                values,
                ..
            } => Self::render_predicate(column, *operator, values),
        }
    }

    fn render_predicate(column: &str, operator: PredicateOperator, values: &[ValueSlot]) -> String {
        let mut result = String::new();
        match operator {
            PredicateOperator::In => {
                let _ = write!(result, "{column} IN (");
                for (position, slot) in values.iter().enumerate() {
                    if position > 0 {
                        result.push_str(", ");
                    }
                    Self::render_slot(&mut result, slot);
                }
                result.push(')');
            }
            _ => {
                let _ = write!(result, "{column} {operator} ");
                Self::render_slot(&mut result, values.first().unwrap_or(&ValueSlot::Placeholder));
            }
        }
        result
    }

    fn render_slot(out: &mut String, slot: &ValueSlot) {
        match slot {
            ValueSlot::Placeholder => out.push('?'),
            ValueSlot::Literal(value) => {
                let _ = write!(out, "{value}");
            }
        }
    }
}
