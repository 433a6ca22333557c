//! Token generators
//!
//! Each generator inspects one aspect of the routed statement and emits
//! tokens anchored to original-text offsets. Generators are independent:
//! none observes another's output, only the engine's final merge orders them.

use super::parameter::ParameterBuilder;
use super::token::{SqlToken, ValueSlot};
use super::RewriteContext;
use crate::error::{Error, Result};
use crate::optimize::EncryptCondition;
use crate::rule::ShardingRule;
use crate::statement::{SelectItemSegment, Span, SqlStatement, StatementKind};
use crate::types::Value;

/// Emits at most one token.
pub trait OptionalTokenGenerator {
    fn generate(
        &self,
        context: &RewriteContext<'_>,
        builder: &mut ParameterBuilder,
        rule: &ShardingRule,
        query_with_cipher_column: bool,
    ) -> Result<Option<SqlToken>>;
}

/// Emits zero or more tokens.
pub trait CollectionTokenGenerator {
    fn generate(
        &self,
        context: &RewriteContext<'_>,
        builder: &mut ParameterBuilder,
        rule: &ShardingRule,
        query_with_cipher_column: bool,
    ) -> Result<Vec<SqlToken>>;
}

/// Logical table references become per-unit physical names.
pub struct TableTokenGenerator;

impl CollectionTokenGenerator for TableTokenGenerator {
    fn generate(
        &self,
        context: &RewriteContext<'_>,
        _builder: &mut ParameterBuilder,
        rule: &ShardingRule,
        _query_with_cipher_column: bool,
    ) -> Result<Vec<SqlToken>> {
        Ok(context
            .statement
            .tables
            .iter()
            .filter(|table| {
                rule.is_sharding_table(&table.name) || rule.is_broadcast_table(&table.name)
            })
            .map(|table| SqlToken::Table {
                span: table.span,
                logic_table: table.name.clone(),
            })
            .collect())
    }
}

/// Inserts the generated key column name into an explicit INSERT column list
/// and appends the generated values to the parameter builder.
pub struct InsertGeneratedKeyNameTokenGenerator;

impl OptionalTokenGenerator for InsertGeneratedKeyNameTokenGenerator {
    fn generate(
        &self,
        context: &RewriteContext<'_>,
        builder: &mut ParameterBuilder,
        _rule: &ShardingRule,
        _query_with_cipher_column: bool,
    ) -> Result<Option<SqlToken>> {
        if context.statement.kind != StatementKind::Insert {
            return Ok(None);
        }
        let Some(segments) = &context.statement.insert else {
            return Ok(None);
        };
        if segments.columns.is_empty() {
            return Ok(None);
        }
        let Some(key) = context.route_result.generated_key() else {
            return Ok(None);
        };
        if !key.generated {
            return Ok(None);
        }
        let parameterized = segments.rows.iter().flatten().any(|value| {
            matches!(value, crate::statement::ExpressionSegment::Parameter(_))
        });
        if parameterized {
            let base = context.parameters.len();
            for (offset, value) in key.values.iter().enumerate() {
                builder.add(base + offset, value.clone());
            }
        }
        let position = segments.columns_span.end.saturating_sub(1);
        Ok(Some(SqlToken::InsertGeneratedKeyName {
            span: Span::new(position, position),
            column: key.column.clone(),
            close_paren: false,
        }))
    }
}

/// Projected encrypt columns swap to their cipher or plain shadow names.
pub struct SelectEncryptItemTokenGenerator;

impl CollectionTokenGenerator for SelectEncryptItemTokenGenerator {
    fn generate(
        &self,
        context: &RewriteContext<'_>,
        _builder: &mut ParameterBuilder,
        rule: &ShardingRule,
        query_with_cipher_column: bool,
    ) -> Result<Vec<SqlToken>> {
        if context.statement.kind != StatementKind::Select || context.statement.tables.is_empty() {
            return Ok(Vec::new());
        }
        let Some(select) = &context.statement.select else {
            return Ok(Vec::new());
        };
        let mut result = Vec::new();
        for item in &select.items {
            let SelectItemSegment::Column { column, .. } = item else {
                continue;
            };
            let Some(table) = owning_encrypt_table(rule, context.statement, &column.name, column.owner.as_deref())
            else {
                continue;
            };
            let replacement = if !query_with_cipher_column {
                rule.encrypt_rule
                    .find_plain_column(&table, &column.name)
                    .map(Ok)
                    .unwrap_or_else(|| rule.encrypt_rule.cipher_column(&table, &column.name))?
            } else {
                rule.encrypt_rule.cipher_column(&table, &column.name)?
            };
            result.push(SqlToken::SelectEncryptItem {
                span: column.span,
                owner: column.owner.clone(),
                column: replacement,
            });
        }
        Ok(result)
    }
}

/// Predicates over encrypt columns re-render against the physical column,
/// with bound values swapped for their encrypted forms in the builder.
pub struct WhereEncryptColumnTokenGenerator;

impl CollectionTokenGenerator for WhereEncryptColumnTokenGenerator {
    fn generate(
        &self,
        context: &RewriteContext<'_>,
        builder: &mut ParameterBuilder,
        rule: &ShardingRule,
        query_with_cipher_column: bool,
    ) -> Result<Vec<SqlToken>> {
        let conditions = &context.route_result.encrypt_conditions;
        let mut result = Vec::with_capacity(conditions.conditions.len());
        for condition in &conditions.conditions {
            let token = if query_with_cipher_column {
                Self::cipher_token(condition, builder, rule, context.parameters)?
            } else {
                Self::plain_token(condition, rule)?
            };
            result.push(token);
        }
        Ok(result)
    }
}

impl WhereEncryptColumnTokenGenerator {
    fn cipher_token(
        condition: &EncryptCondition,
        builder: &mut ParameterBuilder,
        rule: &ShardingRule,
        parameters: &[Value],
    ) -> Result<SqlToken> {
        let values = condition.values(parameters)?;
        let assisted = rule
            .encrypt_rule
            .find_assisted_query_column(&condition.table, &condition.column);
        let (column, encrypted) = match assisted {
            Some(column) => (
                column,
                rule.encrypt_rule
                    .assisted_query_values(&condition.table, &condition.column, &values)?,
            ),
            None => (
                rule.encrypt_rule.cipher_column(&condition.table, &condition.column)?,
                rule.encrypt_rule
                    .encrypt_values(&condition.table, &condition.column, &values)?,
            ),
        };
        for (position, parameter_index) in &condition.position_index_map {
            builder.replace(*parameter_index, encrypted[*position].clone());
        }
        let slots = encrypted
            .iter()
            .enumerate()
            .map(|(position, value)| {
                if condition.position_index_map.contains_key(&position) {
                    ValueSlot::Placeholder
                } else {
                    ValueSlot::Literal(value.clone())
                }
            })
            .collect();
        Ok(SqlToken::WhereEncryptColumn {
            span: condition.span,
            column,
            operator: condition.operator,
            values: slots,
        })
    }

    fn plain_token(condition: &EncryptCondition, rule: &ShardingRule) -> Result<SqlToken> {
        let column = rule
            .encrypt_rule
            .find_plain_column(&condition.table, &condition.column)
            .ok_or_else(|| Error::PlainColumnRequired {
                table: condition.table.clone(),
                column: condition.column.clone(),
            })?;
        let count = condition.position_value_map.len() + condition.position_index_map.len();
        let slots = (0..count)
            .map(|position| match condition.position_value_map.get(&position) {
                Some(value) => ValueSlot::Literal(value.clone()),
                None => ValueSlot::Placeholder,
            })
            .collect();
        Ok(SqlToken::WhereEncryptColumn {
            span: condition.span,
            column,
            operator: condition.operator,
            values: slots,
        })
    }
}

/// The referenced table owning `column` as an encrypt logic column, honoring
/// an explicit owner qualifier first.
fn owning_encrypt_table(
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
            .filter(|table| rule.encrypt_rule.is_encrypt_column(&table.name, column))
            .map(|table| table.name.clone());
    }
    statement
        .tables
        .iter()
        .find(|table| rule.encrypt_rule.is_encrypt_column(&table.name, column))
        .map(|table| table.name.clone())
}
