//! Routing engine selection
//!
//! A total decision procedure from (statement kind, rule shape, condition
//! shape) to an engine variant. Selection never fails: shapes the rules
//! cannot pin down degrade to the safest broadcast or unicast choice.

use super::condition::ShardingConditions;
use super::{broadcast, complex, standard, unicast, RoutingResult};
use crate::error::Result;
use crate::optimize::OptimizedStatement;
use crate::rule::{ShardingMetadata, ShardingRule};
use crate::statement::{DalKind, SqlStatement, StatementKind};

/// The closed set of routing strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingEngine {
    /// Single governing sharding table (bound tables ride along).
    Standard { logic_table: String },
    /// Independently sharded tables, combined per data source.
    Complex { logic_tables: Vec<String> },
    /// Every data source once.
    DatabaseBroadcast,
    /// Every physical table of every referenced logical table.
    TableBroadcast,
    /// One representative per distinct data-source group.
    DataSourceGroupBroadcast,
    /// Every primary instance.
    MasterInstanceBroadcast,
    /// Any single target suffices.
    Unicast,
    /// No physical target at all.
    Ignore,
    /// Everything lives on the default data source.
    DefaultDatabase,
}

impl RoutingEngine {
    pub fn route(
        &self,
        rule: &ShardingRule,
        metadata: &ShardingMetadata,
        table_names: &[String],
        conditions: &ShardingConditions,
    ) -> Result<RoutingResult> {
        match self {
            RoutingEngine::Standard { logic_table } => {
                standard::route(rule, logic_table, table_names, conditions)
            }
            RoutingEngine::Complex { logic_tables } => {
                complex::route(rule, logic_tables, table_names, conditions)
            }
            RoutingEngine::DatabaseBroadcast => broadcast::database(rule),
            RoutingEngine::TableBroadcast => broadcast::table(rule, table_names),
            RoutingEngine::DataSourceGroupBroadcast => broadcast::data_source_group(rule),
            RoutingEngine::MasterInstanceBroadcast => broadcast::master_instance(rule, metadata),
            RoutingEngine::Unicast => unicast::route(rule, table_names),
            RoutingEngine::Ignore => Ok(RoutingResult::default()),
            RoutingEngine::DefaultDatabase => unicast::default_database(rule, table_names),
        }
    }
}

/// Selects the engine for a statement. Total: every input maps to a variant.
pub fn create(
    rule: &ShardingRule,
    statement: &SqlStatement,
    optimized_statement: &OptimizedStatement,
    conditions: &ShardingConditions,
) -> RoutingEngine {
    let table_names = optimized_statement.tables.names();
    match statement.kind {
        StatementKind::Tcl => return RoutingEngine::DatabaseBroadcast,
        StatementKind::Ddl => return RoutingEngine::TableBroadcast,
        StatementKind::Dal(kind) => return create_dal(kind, table_names),
        StatementKind::Dcl => return create_dcl(optimized_statement),
        _ => {}
    }
    if rule.is_all_in_default_data_source(table_names) && rule.default_data_source().is_some() {
        return RoutingEngine::DefaultDatabase;
    }
    if rule.is_all_broadcast_tables(table_names) {
        return if statement.kind.is_read() {
            RoutingEngine::Unicast
        } else {
            RoutingEngine::DatabaseBroadcast
        };
    }
    if (statement.kind.is_dml() && conditions.is_always_false()) || table_names.is_empty() {
        return RoutingEngine::Unicast;
    }
    create_sharding(rule, table_names)
}

fn create_dal(kind: DalKind, table_names: &[String]) -> RoutingEngine {
    match kind {
        DalKind::ShowDatabases | DalKind::Use => RoutingEngine::Ignore,
        DalKind::Set | DalKind::ResetParameter => RoutingEngine::DatabaseBroadcast,
        DalKind::Other => {
            if table_names.is_empty() {
                RoutingEngine::DataSourceGroupBroadcast
            } else {
                RoutingEngine::Unicast
            }
        }
    }
}

fn create_dcl(optimized_statement: &OptimizedStatement) -> RoutingEngine {
    // GRANT scoped to one concrete table touches every shard of it; anything
    // wider goes to every primary instance.
    let single_concrete_table = optimized_statement
        .tables
        .single_table_name()
        .is_some_and(|table| table != "*");
    if single_concrete_table {
        RoutingEngine::TableBroadcast
    } else {
        RoutingEngine::MasterInstanceBroadcast
    }
}

fn create_sharding(rule: &ShardingRule, table_names: &[String]) -> RoutingEngine {
    let sharding_tables = rule.sharding_logic_table_names(table_names);
    // Unruled tables on a multi-source setup without a default data source
    // reach this branch; any single target can answer for them.
    if sharding_tables.is_empty() {
        return RoutingEngine::Unicast;
    }
    if sharding_tables.len() == 1 || rule.is_all_binding_tables(&sharding_tables) {
        RoutingEngine::Standard {
            logic_table: sharding_tables
                .first()
                .cloned()
                .unwrap_or_default(),
        }
    } else {
        RoutingEngine::Complex {
            logic_tables: sharding_tables,
        }
    }
}
