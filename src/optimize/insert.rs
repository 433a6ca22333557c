//! INSERT attributes: column list and generated-key resolution

use crate::error::Result;
use crate::rule::ShardingRule;
use crate::statement::{ExpressionSegment, InsertSegments};
use crate::types::Value;

/// The generated-key outcome for one INSERT.
///
/// `generated` distinguishes a key this core produced from one the client
/// supplied in its column list; only the former is written back into the SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedKey {
    pub column: String,
    pub generated: bool,
    /// One value per VALUES row.
    pub values: Vec<Value>,
}

/// INSERT-specific attributes of an optimized statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertAttributes {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub generated_key: Option<GeneratedKey>,
}

impl InsertAttributes {
    pub fn new(
        rule: &ShardingRule,
        segments: &InsertSegments,
        logic_table: &str,
        parameters: &[Value],
    ) -> Result<Self> {
        Ok(InsertAttributes {
            columns: segments.columns.clone(),
            row_count: segments.rows.len(),
            generated_key: Self::resolve_generated_key(rule, segments, logic_table, parameters)?,
        })
    }

    fn resolve_generated_key(
        rule: &ShardingRule,
        segments: &InsertSegments,
        logic_table: &str,
        parameters: &[Value],
    ) -> Result<Option<GeneratedKey>> {
        let Some(key_column) = rule.find_generate_key_column(logic_table) else {
            return Ok(None);
        };
        let supplied_position = segments
            .columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(&key_column));
        if let Some(position) = supplied_position {
            let values = segments
                .rows
                .iter()
                .map(|row| Self::row_value(row, position, parameters))
                .collect();
            return Ok(Some(GeneratedKey {
                column: key_column,
                generated: false,
                values,
            }));
        }
        let values = segments
            .rows
            .iter()
            .map(|_| rule.generate_key(logic_table))
            .collect::<Result<Vec<Value>>>()?;
        Ok(Some(GeneratedKey {
            column: key_column,
            generated: true,
            values,
        }))
    }

    fn row_value(row: &[ExpressionSegment], position: usize, parameters: &[Value]) -> Value {
        match row.get(position) {
            Some(ExpressionSegment::Literal(value)) => value.clone(),
            Some(ExpressionSegment::Parameter(index)) => {
                parameters.get(*index).cloned().unwrap_or(Value::Null)
            }
            None => Value::Null,
        }
    }
}
