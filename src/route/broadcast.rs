//! Broadcast routing variants
//!
//! No condition evaluation here: these engines enumerate targets from the
//! rule/metadata topology alone.

use super::{RoutingResult, RoutingUnit, TableUnit};
use crate::error::{Error, Result};
use crate::rule::{ShardingMetadata, ShardingRule};

/// Every configured data source once, with no table bindings.
pub fn database(rule: &ShardingRule) -> Result<RoutingResult> {
    let mut result = RoutingResult::default();
    for data_source in &rule.data_source_names {
        result.add(RoutingUnit::new(data_source.clone()))?;
    }
    Ok(result)
}

/// Every physical table of every referenced logical table.
///
/// An unruled table has exactly one physical home: the default data source.
pub fn table(rule: &ShardingRule, table_names: &[String]) -> Result<RoutingResult> {
    let mut result = RoutingResult::default();
    for logic_table in table_names {
        match rule.find_table_rule(logic_table) {
            Some(table_rule) => {
                for node in &table_rule.actual_data_nodes {
                    result.add(RoutingUnit::with_tables(
                        node.data_source_name.clone(),
                        vec![TableUnit::new(logic_table.clone(), node.table_name.clone())],
                    ))?;
                }
            }
            None => {
                let data_source = rule
                    .default_data_source()
                    .or(rule.data_source_names.first().map(String::as_str))
                    .ok_or(Error::NoAvailableDataSource)?;
                result.add(RoutingUnit::with_tables(
                    data_source.to_owned(),
                    vec![TableUnit::new(logic_table.clone(), logic_table.clone())],
                ))?;
            }
        }
    }
    Ok(result)
}

/// Every primary instance known to the metadata, restricted to data sources
/// the rule actually manages.
pub fn master_instance(rule: &ShardingRule, metadata: &ShardingMetadata) -> Result<RoutingResult> {
    let mut result = RoutingResult::default();
    for data_source in metadata.master_data_source_names() {
        if rule.data_source_names.is_empty() || rule.data_source_names.contains(&data_source) {
            result.add(RoutingUnit::new(data_source))?;
        }
    }
    Ok(result)
}

/// One representative per distinct data-source group. Data sources hosting
/// the same set of logical tables form one group; the first member in
/// declaration order answers for the group.
pub fn data_source_group(rule: &ShardingRule) -> Result<RoutingResult> {
    let mut result = RoutingResult::default();
    let mut seen_groups: Vec<Vec<String>> = Vec::new();
    for data_source in &rule.data_source_names {
        let mut hosted: Vec<String> = rule
            .table_rules
            .iter()
            .filter(|table_rule| {
                table_rule
                    .actual_data_nodes
                    .iter()
                    .any(|node| &node.data_source_name == data_source)
            })
            .map(|table_rule| table_rule.logic_table.clone())
            .collect();
        hosted.sort();
        if !seen_groups.contains(&hosted) {
            seen_groups.push(hosted);
            result.add(RoutingUnit::new(data_source.clone()))?;
        }
    }
    Ok(result)
}
