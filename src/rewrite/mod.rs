//! SQL rewriting: per-target text and parameters
//!
//! The engine runs every token generator over the routed statement, merges
//! and sorts the emitted tokens by start offset, and then renders one
//! `SqlUnit` per routing unit with a single forward pass over the original
//! text. The original text is never mutated in place; untouched spans are
//! copied byte-exact.

pub mod generator;
pub mod parameter;
pub mod token;

pub use parameter::ParameterBuilder;
pub use token::{SqlToken, ValueSlot};

use crate::error::Result;
use crate::execute::{RouteUnit, SqlUnit};
use crate::route::{RoutingResult, RoutingUnit, SqlRouteResult};
use crate::rule::ShardingRule;
use crate::statement::SqlStatement;
use crate::types::Value;
use generator::{
    CollectionTokenGenerator, InsertGeneratedKeyNameTokenGenerator, OptionalTokenGenerator,
    SelectEncryptItemTokenGenerator, TableTokenGenerator, WhereEncryptColumnTokenGenerator,
};

/// Everything a token generator may inspect.
pub struct RewriteContext<'a> {
    pub statement: &'a SqlStatement,
    pub route_result: &'a SqlRouteResult,
    pub parameters: &'a [Value],
}

pub struct SqlRewriteEngine<'a> {
    sql: &'a str,
    tokens: Vec<SqlToken>,
    parameter_builder: ParameterBuilder,
}

impl<'a> SqlRewriteEngine<'a> {
    pub fn new(
        rule: &ShardingRule,
        statement: &'a SqlStatement,
        route_result: &SqlRouteResult,
        parameters: &[Value],
        query_with_cipher_column: bool,
    ) -> Result<Self> {
        let mut builder = ParameterBuilder::new(parameters.to_vec());
        Self::revise_pagination(&mut builder, route_result);
        let context = RewriteContext {
            statement,
            route_result,
            parameters,
        };
        let mut tokens = Vec::new();
        tokens.extend(TableTokenGenerator.generate(
            &context,
            &mut builder,
            rule,
            query_with_cipher_column,
        )?);
        if let Some(token) = InsertGeneratedKeyNameTokenGenerator.generate(
            &context,
            &mut builder,
            rule,
            query_with_cipher_column,
        )? {
            tokens.push(token);
        }
        tokens.extend(SelectEncryptItemTokenGenerator.generate(
            &context,
            &mut builder,
            rule,
            query_with_cipher_column,
        )?);
        tokens.extend(WhereEncryptColumnTokenGenerator.generate(
            &context,
            &mut builder,
            rule,
            query_with_cipher_column,
        )?);
        tokens.sort_by_key(|token| token.span().start);
        tracing::debug!(tokens = tokens.len(), "rewrite tokens collected");
        Ok(SqlRewriteEngine {
            sql: &statement.sql,
            tokens,
            parameter_builder: builder,
        })
    }

    /// When a paginated SELECT fans out, every target must return the rows
    /// the merger needs: offset drops to zero and the row count widens.
    fn revise_pagination(builder: &mut ParameterBuilder, route_result: &SqlRouteResult) {
        if route_result.routing_result.is_single_routing() {
            return;
        }
        let Some(select) = route_result.optimized_statement.select() else {
            return;
        };
        let Some(pagination) = &select.pagination else {
            return;
        };
        if let Some(index) = pagination.offset_parameter_index() {
            builder.replace(index, Value::I64(pagination.revised_offset()));
        }
        if let Some(index) = pagination.row_count_parameter_index() {
            builder.replace(index, Value::I64(pagination.revised_row_count(select)));
        }
    }

    pub fn parameter_builder(&self) -> &ParameterBuilder {
        &self.parameter_builder
    }

    pub fn tokens(&self) -> &[SqlToken] {
        &self.tokens
    }

    /// Renders the text and parameters for one routing unit. With no unit,
    /// logical names stay in place.
    pub fn generate_sql(&self, routing_unit: Option<&RoutingUnit>) -> SqlUnit {
        let mut sql = String::with_capacity(self.sql.len());
        let mut cursor = 0;
        for token in &self.tokens {
            let span = token.span();
            sql.push_str(&self.sql[cursor..span.start]);
            sql.push_str(&token.render(routing_unit));
            cursor = span.end;
        }
        sql.push_str(&self.sql[cursor..]);
        SqlUnit::new(sql, self.parameter_builder.parameters(routing_unit))
    }

    /// One finalized `RouteUnit` per routing unit.
    pub fn route_units(&self, routing_result: &RoutingResult) -> Vec<RouteUnit> {
        routing_result
            .routing_units
            .iter()
            .map(|unit| {
                RouteUnit::new(unit.data_source_name.clone(), self.generate_sql(Some(unit)))
            })
            .collect()
    }
}
