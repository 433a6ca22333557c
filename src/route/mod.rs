//! Routing: deciding which physical targets execute a statement
//!
//! The factory picks a routing engine from the statement kind and rule
//! shape; the engine computes a `RoutingResult` of (data source, logical →
//! physical table bindings) units. Everything is a pure function of the
//! rule, metadata and statement handed in.

pub mod broadcast;
pub mod complex;
pub mod condition;
pub mod factory;
pub mod standard;
pub mod unicast;

pub use condition::{RouteValue, RouteValueKind, ShardingCondition, ShardingConditions};
pub use factory::RoutingEngine;

use crate::error::{Error, Result};
use crate::optimize::{EncryptConditions, GeneratedKey, OptimizedStatement, StatementAttributes};
use crate::rule::{ShardingMetadata, ShardingRule};
use crate::statement::{SqlStatement, StatementKind};
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// One logical-table → physical-table binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableUnit {
    pub logic_table: String,
    pub actual_table: String,
}

impl TableUnit {
    pub fn new(logic_table: impl Into<String>, actual_table: impl Into<String>) -> Self {
        TableUnit {
            logic_table: logic_table.into(),
            actual_table: actual_table.into(),
        }
    }
}

/// One execution target: a data source plus its table bindings.
///
/// A logical table binds to exactly one physical table within a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingUnit {
    pub data_source_name: String,
    pub table_units: Vec<TableUnit>,
}

impl RoutingUnit {
    pub fn new(data_source_name: impl Into<String>) -> Self {
        RoutingUnit {
            data_source_name: data_source_name.into(),
            table_units: Vec::new(),
        }
    }

    pub fn with_tables(data_source_name: impl Into<String>, table_units: Vec<TableUnit>) -> Self {
        RoutingUnit {
            data_source_name: data_source_name.into(),
            table_units,
        }
    }

    /// The physical name bound to a logical table in this unit, if any.
    pub fn actual_table(&self, logic_table: &str) -> Option<&str> {
        self.table_units
            .iter()
            .find(|unit| unit.logic_table.eq_ignore_ascii_case(logic_table))
            .map(|unit| unit.actual_table.as_str())
    }
}

/// The set of routing units for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingResult {
    pub routing_units: Vec<RoutingUnit>,
}

impl RoutingResult {
    /// Adds a unit, ignoring an exact duplicate. A unit that repeats an
    /// already-routed (data source, physical table) pair under a different
    /// binding set violates the result invariant and errors.
    pub fn add(&mut self, unit: RoutingUnit) -> Result<()> {
        if self.routing_units.contains(&unit) {
            return Ok(());
        }
        for table_unit in &unit.table_units {
            let duplicated = self.routing_units.iter().any(|existing| {
                existing.data_source_name == unit.data_source_name
                    && existing
                        .table_units
                        .iter()
                        .any(|t| t.actual_table == table_unit.actual_table
                            && t.logic_table.eq_ignore_ascii_case(&table_unit.logic_table))
            });
            if duplicated {
                return Err(Error::DuplicateRoutingTarget {
                    data_source: unit.data_source_name.clone(),
                    table: table_unit.actual_table.clone(),
                });
            }
        }
        self.routing_units.push(unit);
        Ok(())
    }

    pub fn is_single_routing(&self) -> bool {
        self.routing_units.len() == 1
    }

    pub fn data_source_names(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for unit in &self.routing_units {
            if !result.contains(&unit.data_source_name) {
                result.push(unit.data_source_name.clone());
            }
        }
        result
    }
}

/// Everything the rewrite/execution layers need about one routed statement.
#[derive(Debug, Clone)]
pub struct SqlRouteResult {
    pub optimized_statement: OptimizedStatement,
    pub sharding_conditions: ShardingConditions,
    pub encrypt_conditions: EncryptConditions,
    pub routing_result: RoutingResult,
}

impl SqlRouteResult {
    pub fn generated_key(&self) -> Option<&GeneratedKey> {
        self.optimized_statement.generated_key()
    }
}

/// The routing entry point. Holds only borrowed, read-only rule state, so
/// one router (or many) can serve concurrent statements.
#[derive(Debug, Clone, Copy)]
pub struct StatementRouter<'a> {
    pub rule: &'a ShardingRule,
    pub metadata: &'a ShardingMetadata,
}

impl<'a> StatementRouter<'a> {
    pub fn new(rule: &'a ShardingRule, metadata: &'a ShardingMetadata) -> Self {
        StatementRouter { rule, metadata }
    }

    pub fn route(&self, statement: &SqlStatement, parameters: &[Value]) -> Result<SqlRouteResult> {
        let optimized_statement = OptimizedStatement::optimize(self.rule, statement, parameters)?;
        let sharding_conditions = self.extract_conditions(statement, &optimized_statement, parameters)?;
        let encrypt_conditions = if statement.kind.is_dml() {
            EncryptConditions::extract(&self.rule.encrypt_rule, statement)?
        } else {
            EncryptConditions::default()
        };
        let engine = factory::create(self.rule, statement, &optimized_statement, &sharding_conditions);
        tracing::debug!(engine = ?engine, tables = ?optimized_statement.tables.names(), "routing engine selected");
        let routing_result = engine.route(
            self.rule,
            self.metadata,
            optimized_statement.tables.names(),
            &sharding_conditions,
        )?;
        tracing::debug!(units = routing_result.routing_units.len(), "routing computed");
        Ok(SqlRouteResult {
            optimized_statement,
            sharding_conditions,
            encrypt_conditions,
            routing_result,
        })
    }

    fn extract_conditions(
        &self,
        statement: &SqlStatement,
        optimized_statement: &OptimizedStatement,
        parameters: &[Value],
    ) -> Result<ShardingConditions> {
        match (&statement.kind, &optimized_statement.attributes) {
            (StatementKind::Insert, StatementAttributes::Insert(insert)) => {
                let logic_table = optimized_statement
                    .tables
                    .single_table_name()
                    .unwrap_or_default()
                    .to_owned();
                match &statement.insert {
                    Some(segments) => condition::extract_insert_conditions(
                        self.rule,
                        segments,
                        &logic_table,
                        insert.generated_key.as_ref(),
                        parameters,
                    ),
                    None => Ok(ShardingConditions::default()),
                }
            }
            _ if statement.kind.is_dml() => {
                condition::extract_where_conditions(self.rule, statement, parameters)
            }
            _ => Ok(ShardingConditions::default()),
        }
    }
}
