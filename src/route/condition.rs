//! Sharding condition extraction
//!
//! Conditions carry the predicate (or insert) values relevant to sharding
//! columns, and nothing else; they exist purely so routing engines can feed
//! sharding algorithms. "No conditions" and "provably matches nothing" are
//! both ordinary values here, not errors.

use crate::error::{Error, Result};
use crate::optimize::GeneratedKey;
use crate::rule::ShardingRule;
use crate::statement::{
    ExpressionSegment, InsertSegments, PredicateOperator, SqlStatement,
};
use crate::types::Value;
use std::cmp::Ordering;

/// Values bound to one (table, column) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteValue {
    pub table: String,
    pub column: String,
    pub kind: RouteValueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteValueKind {
    /// Discrete values from `=` or `IN`.
    List(Vec<Value>),
    /// Inclusive bounds from `BETWEEN`.
    Range { lower: Value, upper: Value },
}

/// One conjunction of route values; routing evaluates each independently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShardingCondition {
    pub values: Vec<RouteValue>,
}

/// The full condition set extracted for one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShardingConditions {
    pub conditions: Vec<ShardingCondition>,
    always_false: bool,
}

impl ShardingConditions {
    pub fn new(conditions: Vec<ShardingCondition>) -> Self {
        ShardingConditions {
            conditions,
            always_false: false,
        }
    }

    /// A condition set statically known to match no rows.
    pub fn always_false() -> Self {
        ShardingConditions {
            conditions: Vec::new(),
            always_false: true,
        }
    }

    pub fn is_always_false(&self) -> bool {
        self.always_false
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return Some(a.cmp(&b));
    }
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn within_range(value: &Value, lower: &Value, upper: &Value) -> bool {
    // Incomparable values are kept: a too-wide route is safe, a dropped one
    // is not.
    let above = compare(value, lower).map(|o| o != Ordering::Less).unwrap_or(true);
    let below = compare(value, upper).map(|o| o != Ordering::Greater).unwrap_or(true);
    above && below
}

/// ANDs a new route value into the accumulated kind for one column.
/// Returns None when the conjunction is unsatisfiable.
fn intersect(current: RouteValueKind, next: RouteValueKind) -> Option<RouteValueKind> {
    match (current, next) {
        (RouteValueKind::List(a), RouteValueKind::List(b)) => {
            let merged: Vec<Value> = a.into_iter().filter(|value| b.contains(value)).collect();
            if merged.is_empty() {
                None
            } else {
                Some(RouteValueKind::List(merged))
            }
        }
        (RouteValueKind::List(values), RouteValueKind::Range { lower, upper })
        | (RouteValueKind::Range { lower, upper }, RouteValueKind::List(values)) => {
            let merged: Vec<Value> = values
                .into_iter()
                .filter(|value| within_range(value, &lower, &upper))
                .collect();
            if merged.is_empty() {
                None
            } else {
                Some(RouteValueKind::List(merged))
            }
        }
        // Two ranges: keep the first; routing a superset is the safe
        // degradation for bounds we cannot compare.
        (range @ RouteValueKind::Range { .. }, RouteValueKind::Range { .. }) => Some(range),
    }
}

/// Extracts sharding conditions from a WHERE conjunction.
pub fn extract_where_conditions(
    rule: &ShardingRule,
    statement: &SqlStatement,
    parameters: &[Value],
) -> Result<ShardingConditions> {
    // (table, column) -> accumulated kind, in first-seen order.
    let mut accumulated: Vec<(String, String, RouteValueKind)> = Vec::new();
    for predicate in &statement.predicates {
        let column = &predicate.column;
        let Some(table) = owning_sharding_table(rule, statement, &column.name, column.owner.as_deref())
        else {
            continue;
        };
        let Some(kind) = route_value_kind(predicate.operator, &predicate.values, parameters)? else {
            continue;
        };
        let existing = accumulated
            .iter_mut()
            .find(|(t, c, _)| t.eq_ignore_ascii_case(&table) && c.eq_ignore_ascii_case(&column.name));
        match existing {
            Some((_, _, current)) => match intersect(current.clone(), kind) {
                Some(merged) => *current = merged,
                None => return Ok(ShardingConditions::always_false()),
            },
            None => accumulated.push((table, column.name.clone(), kind)),
        }
    }
    if accumulated.is_empty() {
        return Ok(ShardingConditions::default());
    }
    let values = accumulated
        .into_iter()
        .map(|(table, column, kind)| RouteValue { table, column, kind })
        .collect();
    Ok(ShardingConditions::new(vec![ShardingCondition { values }]))
}

/// Extracts one sharding condition per VALUES row of an INSERT.
pub fn extract_insert_conditions(
    rule: &ShardingRule,
    segments: &InsertSegments,
    logic_table: &str,
    generated_key: Option<&GeneratedKey>,
    parameters: &[Value],
) -> Result<ShardingConditions> {
    let mut conditions = Vec::new();
    for (row_index, row) in segments.rows.iter().enumerate() {
        let mut values = Vec::new();
        for (position, column) in segments.columns.iter().enumerate() {
            if !rule.is_sharding_column(logic_table, column) {
                continue;
            }
            let value = match row.get(position) {
                Some(ExpressionSegment::Literal(value)) => value.clone(),
                Some(ExpressionSegment::Parameter(index)) => parameters
                    .get(*index)
                    .cloned()
                    .ok_or(Error::ParameterIndexOutOfRange(*index))?,
                None => continue,
            };
            values.push(RouteValue {
                table: logic_table.to_owned(),
                column: column.clone(),
                kind: RouteValueKind::List(vec![value]),
            });
        }
        if let Some(key) = generated_key {
            if rule.is_sharding_column(logic_table, &key.column) {
                if let Some(value) = key.values.get(row_index) {
                    values.push(RouteValue {
                        table: logic_table.to_owned(),
                        column: key.column.clone(),
                        kind: RouteValueKind::List(vec![value.clone()]),
                    });
                }
            }
        }
        conditions.push(ShardingCondition { values });
    }
    Ok(ShardingConditions::new(conditions))
}

fn route_value_kind(
    operator: PredicateOperator,
    values: &[ExpressionSegment],
    parameters: &[Value],
) -> Result<Option<RouteValueKind>> {
    let resolve = |segment: &ExpressionSegment| -> Result<Value> {
        match segment {
            ExpressionSegment::Literal(value) => Ok(value.clone()),
            ExpressionSegment::Parameter(index) => parameters
                .get(*index)
                .cloned()
                .ok_or(Error::ParameterIndexOutOfRange(*index)),
        }
    };
    match operator {
        PredicateOperator::Equal | PredicateOperator::In => {
            let values = values.iter().map(resolve).collect::<Result<Vec<Value>>>()?;
            if values.is_empty() {
                Ok(None)
            } else {
                Ok(Some(RouteValueKind::List(values)))
            }
        }
        PredicateOperator::Between => match values {
            [lower, upper] => Ok(Some(RouteValueKind::Range {
                lower: resolve(lower)?,
                upper: resolve(upper)?,
            })),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

/// The statement table whose rule shards on this column, honoring an
/// explicit owner qualifier when present.
fn owning_sharding_table(
    rule: &ShardingRule,
    statement: &SqlStatement,
    column: &str,
    owner: Option<&str>,
) -> Option<String> {
    if let Some(owner) = owner {
        return statement
            .tables
            .iter()
            .find(|table| {
                table.name.eq_ignore_ascii_case(owner)
                    || table.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(owner))
            })
            .filter(|table| rule.is_sharding_column(&table.name, column))
            .map(|table| table.name.clone());
    }
    statement
        .tables
        .iter()
        .find(|table| rule.is_sharding_column(&table.name, column))
        .map(|table| table.name.clone())
}
