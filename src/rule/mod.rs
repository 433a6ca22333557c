//! Sharding rule model
//!
//! Rule objects arrive fully resolved (no config-file parsing here) and are
//! read-only for the duration of a routing/rewrite call, so one rule can
//! serve arbitrarily many concurrent statements.

pub mod encrypt;
pub mod keygen;
pub mod strategy;

pub use encrypt::{EncryptColumn, EncryptRule, EncryptTable, Encryptor};
pub use keygen::{IncrementKeyGenerator, KeyGenerator};
pub use strategy::{ModuloShardingAlgorithm, ShardingAlgorithm, ShardingStrategy};

use crate::error::{Error, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One physical (data source, table) location of a logical table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataNode {
    pub data_source_name: String,
    pub table_name: String,
}

impl DataNode {
    pub fn new(data_source_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        DataNode {
            data_source_name: data_source_name.into(),
            table_name: table_name.into(),
        }
    }

    /// Parses `"ds_0.t_order_0"` notation used by rule declarations.
    pub fn parse(text: &str) -> Option<Self> {
        let (data_source, table) = text.split_once('.')?;
        if data_source.is_empty() || table.is_empty() {
            return None;
        }
        Some(DataNode::new(data_source, table))
    }
}

/// Sharding configuration of one logical table.
#[derive(Clone)]
pub struct TableRule {
    pub logic_table: String,
    pub actual_data_nodes: Vec<DataNode>,
    pub database_strategy: ShardingStrategy,
    pub table_strategy: ShardingStrategy,
    pub generate_key_column: Option<String>,
    pub key_generator: Option<Arc<dyn KeyGenerator>>,
}

impl TableRule {
    pub fn new(logic_table: impl Into<String>, actual_data_nodes: Vec<DataNode>) -> Self {
        TableRule {
            logic_table: logic_table.into(),
            actual_data_nodes,
            database_strategy: ShardingStrategy::None,
            table_strategy: ShardingStrategy::None,
            generate_key_column: None,
            key_generator: None,
        }
    }

    /// Distinct data source names, in declaration order.
    pub fn actual_data_source_names(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for node in &self.actual_data_nodes {
            if !result.contains(&node.data_source_name) {
                result.push(node.data_source_name.clone());
            }
        }
        result
    }

    /// Physical table names within one data source, in declaration order.
    pub fn actual_table_names(&self, data_source_name: &str) -> Vec<String> {
        self.actual_data_nodes
            .iter()
            .filter(|node| node.data_source_name == data_source_name)
            .map(|node| node.table_name.clone())
            .collect()
    }
}

impl std::fmt::Debug for TableRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRule")
            .field("logic_table", &self.logic_table)
            .field("actual_data_nodes", &self.actual_data_nodes)
            .field("generate_key_column", &self.generate_key_column)
            .finish_non_exhaustive()
    }
}

/// The resolved sharding rule: table rules plus cross-table classifications.
#[derive(Debug, Clone, Default)]
pub struct ShardingRule {
    /// All configured data source names, in declaration order.
    pub data_source_names: Vec<String>,
    pub table_rules: Vec<TableRule>,
    /// Groups of logical tables guaranteed to shard identically.
    pub binding_table_groups: Vec<Vec<String>>,
    /// Tables replicated to every data source.
    pub broadcast_tables: Vec<String>,
    /// Where unruled tables live. Falls back to the sole data source.
    pub default_data_source_name: Option<String>,
    pub encrypt_rule: EncryptRule,
}

impl ShardingRule {
    pub fn find_table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.table_rules
            .iter()
            .find(|rule| rule.logic_table.eq_ignore_ascii_case(logic_table))
    }

    pub fn table_rule(&self, logic_table: &str) -> Result<&TableRule> {
        self.find_table_rule(logic_table)
            .ok_or_else(|| Error::TableRuleNotFound(logic_table.to_owned()))
    }

    pub fn is_sharding_table(&self, logic_table: &str) -> bool {
        self.find_table_rule(logic_table).is_some()
    }

    pub fn is_broadcast_table(&self, logic_table: &str) -> bool {
        self.broadcast_tables
            .iter()
            .any(|table| table.eq_ignore_ascii_case(logic_table))
    }

    pub fn is_all_broadcast_tables(&self, logic_tables: &[String]) -> bool {
        !logic_tables.is_empty()
            && logic_tables
                .iter()
                .all(|table| self.is_broadcast_table(table))
    }

    /// True when no referenced table is ruled or broadcast, so the whole
    /// statement belongs to the default data source.
    pub fn is_all_in_default_data_source(&self, logic_tables: &[String]) -> bool {
        !logic_tables.is_empty()
            && logic_tables
                .iter()
                .all(|table| !self.is_sharding_table(table) && !self.is_broadcast_table(table))
    }

    /// The default data source, configured or implied by a single-source setup.
    pub fn default_data_source(&self) -> Option<&str> {
        self.default_data_source_name
            .as_deref()
            .or_else(|| match self.data_source_names.as_slice() {
                [single] => Some(single.as_str()),
                _ => None,
            })
    }

    /// The subset of the given tables governed by a table rule.
    pub fn sharding_logic_table_names(&self, logic_tables: &[String]) -> Vec<String> {
        logic_tables
            .iter()
            .filter(|table| self.is_sharding_table(table))
            .cloned()
            .collect()
    }

    fn find_binding_group(&self, logic_table: &str) -> Option<&Vec<String>> {
        self.binding_table_groups.iter().find(|group| {
            group
                .iter()
                .any(|table| table.eq_ignore_ascii_case(logic_table))
        })
    }

    /// True when every given table belongs to one binding group.
    pub fn is_all_binding_tables(&self, logic_tables: &[String]) -> bool {
        if logic_tables.is_empty() {
            return false;
        }
        let Some(group) = self.find_binding_group(&logic_tables[0]) else {
            return false;
        };
        logic_tables.iter().all(|table| {
            group
                .iter()
                .any(|member| member.eq_ignore_ascii_case(table))
        })
    }

    pub fn is_binding_table_of(&self, logic_table: &str, other: &str) -> bool {
        self.find_binding_group(logic_table)
            .map(|group| group.iter().any(|member| member.eq_ignore_ascii_case(other)))
            .unwrap_or(false)
    }

    /// Resolves a bound table's physical name by index alignment: the bound
    /// table's actual table at the same position (within the data source) as
    /// the routed table's actual table. Binding groups guarantee the actual
    /// node lists line up.
    pub fn binding_actual_table(
        &self,
        data_source_name: &str,
        routed_logic_table: &str,
        routed_actual_table: &str,
        target_logic_table: &str,
    ) -> Result<String> {
        let routed_rule = self.table_rule(routed_logic_table)?;
        let target_rule = self.table_rule(target_logic_table)?;
        let index = routed_rule
            .actual_table_names(data_source_name)
            .iter()
            .position(|table| table == routed_actual_table)
            .ok_or_else(|| Error::TableRuleNotFound(routed_actual_table.to_owned()))?;
        target_rule
            .actual_table_names(data_source_name)
            .get(index)
            .cloned()
            .ok_or_else(|| Error::TableRuleNotFound(target_logic_table.to_owned()))
    }

    /// True when the column shards the table on either dimension.
    pub fn is_sharding_column(&self, logic_table: &str, column: &str) -> bool {
        self.find_table_rule(logic_table).is_some_and(|rule| {
            [&rule.database_strategy, &rule.table_strategy]
                .iter()
                .any(|strategy| {
                    strategy
                        .sharding_column()
                        .is_some_and(|c| c.eq_ignore_ascii_case(column))
                })
        })
    }

    pub fn find_generate_key_column(&self, logic_table: &str) -> Option<String> {
        self.find_table_rule(logic_table)
            .and_then(|rule| rule.generate_key_column.clone())
    }

    /// Produces the next generated key for the table.
    pub fn generate_key(&self, logic_table: &str) -> Result<Value> {
        let rule = self.table_rule(logic_table)?;
        let generator = rule
            .key_generator
            .as_ref()
            .ok_or_else(|| Error::KeyGeneratorNotFound(logic_table.to_owned()))?;
        Ok(generator.generate())
    }
}

/// One physical data source instance known to the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub name: String,
    /// Primary instance in a replicated group.
    pub master: bool,
}

impl DataSourceInfo {
    pub fn master(name: impl Into<String>) -> Self {
        DataSourceInfo {
            name: name.into(),
            master: true,
        }
    }

    pub fn replica(name: impl Into<String>) -> Self {
        DataSourceInfo {
            name: name.into(),
            master: false,
        }
    }
}

/// Topology handed in from the metadata collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingMetadata {
    pub data_sources: Vec<DataSourceInfo>,
}

impl ShardingMetadata {
    pub fn of_masters(names: &[&str]) -> Self {
        ShardingMetadata {
            data_sources: names.iter().map(|name| DataSourceInfo::master(*name)).collect(),
        }
    }

    /// Master instance names; when nothing is flagged, every instance counts.
    pub fn master_data_source_names(&self) -> Vec<String> {
        let masters: Vec<String> = self
            .data_sources
            .iter()
            .filter(|info| info.master)
            .map(|info| info.name.clone())
            .collect();
        if masters.is_empty() {
            self.data_sources.iter().map(|info| info.name.clone()).collect()
        } else {
            masters
        }
    }
}
