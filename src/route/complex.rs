//! Complex routing: independently sharded tables in one statement
//!
//! Each involved sharding table routes on its own via the standard engine;
//! the per-table results are then combined per shared data source, taking
//! the Cartesian product of their table bindings so every physical
//! combination gets exactly one routing unit.

use super::condition::ShardingConditions;
use super::{standard, RoutingResult, RoutingUnit};
use crate::error::Result;
use crate::rule::ShardingRule;

pub fn route(
    rule: &ShardingRule,
    logic_tables: &[String],
    table_names: &[String],
    conditions: &ShardingConditions,
) -> Result<RoutingResult> {
    let mut per_table: Vec<RoutingResult> = Vec::new();
    let mut covered: Vec<String> = Vec::new();
    for logic_table in logic_tables {
        if covered.iter().any(|t| t.eq_ignore_ascii_case(logic_table)) {
            continue;
        }
        let routed = standard::route(rule, logic_table, table_names, conditions)?;
        covered.push(logic_table.clone());
        // Binding companions already ride along in the standard result.
        for table in table_names {
            if rule.is_binding_table_of(logic_table, table) {
                covered.push(table.clone());
            }
        }
        per_table.push(routed);
    }
    match per_table.len() {
        0 => Ok(RoutingResult::default()),
        1 => Ok(per_table.into_iter().next().unwrap_or_default()),
        _ => cartesian(per_table),
    }
}

/// Combines per-table results within each data source hosted by all of them.
fn cartesian(per_table: Vec<RoutingResult>) -> Result<RoutingResult> {
    let shared_data_sources: Vec<String> = per_table[0]
        .data_source_names()
        .into_iter()
        .filter(|name| {
            per_table[1..]
                .iter()
                .all(|result| result.data_source_names().contains(name))
        })
        .collect();
    let mut result = RoutingResult::default();
    for data_source in shared_data_sources {
        let groups: Vec<Vec<&RoutingUnit>> = per_table
            .iter()
            .map(|routed| {
                routed
                    .routing_units
                    .iter()
                    .filter(|unit| unit.data_source_name == data_source)
                    .collect()
            })
            .collect();
        let mut combinations: Vec<RoutingUnit> = vec![RoutingUnit::new(data_source.clone())];
        for group in groups {
            let mut next = Vec::with_capacity(combinations.len() * group.len());
            for combination in &combinations {
                for unit in &group {
                    let mut merged = combination.clone();
                    merged.table_units.extend(unit.table_units.iter().cloned());
                    next.push(merged);
                }
            }
            combinations = next;
        }
        for combination in combinations {
            result.add(combination)?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::condition::{RouteValue, RouteValueKind, ShardingCondition};
    use crate::rule::{DataNode, ModuloShardingAlgorithm, ShardingStrategy, TableRule};
    use crate::types::Value;
    use std::sync::Arc;

    fn rule() -> ShardingRule {
        let nodes = |table: &str| {
            vec![
                DataNode::new("ds_0", format!("{table}_0")),
                DataNode::new("ds_0", format!("{table}_1")),
                DataNode::new("ds_1", format!("{table}_0")),
                DataNode::new("ds_1", format!("{table}_1")),
            ]
        };
        let mut order = TableRule::new("t_order", nodes("t_order"));
        order.table_strategy =
            ShardingStrategy::standard("order_id", Arc::new(ModuloShardingAlgorithm));
        let mut user = TableRule::new("t_user", nodes("t_user"));
        user.table_strategy =
            ShardingStrategy::standard("user_id", Arc::new(ModuloShardingAlgorithm));
        ShardingRule {
            data_source_names: vec!["ds_0".into(), "ds_1".into()],
            table_rules: vec![order, user],
            ..Default::default()
        }
    }

    #[test]
    fn test_cartesian_combines_per_data_source() {
        let tables = vec!["t_order".to_string(), "t_user".to_string()];
        let conditions = ShardingConditions::new(vec![ShardingCondition {
            values: vec![
                RouteValue {
                    table: "t_order".into(),
                    column: "order_id".into(),
                    kind: RouteValueKind::List(vec![Value::I64(0)]),
                },
                RouteValue {
                    table: "t_user".into(),
                    column: "user_id".into(),
                    kind: RouteValueKind::List(vec![Value::I64(1)]),
                },
            ],
        }]);
        let result = route(&rule(), &tables, &tables, &conditions).unwrap();
        // One shard per table, present in both data sources.
        assert_eq!(result.routing_units.len(), 2);
        for unit in &result.routing_units {
            assert_eq!(unit.actual_table("t_order"), Some("t_order_0"));
            assert_eq!(unit.actual_table("t_user"), Some("t_user_1"));
        }
        assert_eq!(result.data_source_names(), vec!["ds_0".to_string(), "ds_1".to_string()]);
    }

    #[test]
    fn test_unconstrained_tables_full_product() {
        let tables = vec!["t_order".to_string(), "t_user".to_string()];
        let result = route(&rule(), &tables, &tables, &ShardingConditions::default()).unwrap();
        // 2 tables x 2 shards each, per data source: 2 * (2*2) = 8 units.
        assert_eq!(result.routing_units.len(), 8);
    }

    #[test]
    fn test_no_sharding_tables_routes_nothing() {
        let result = route(&rule(), &[], &[], &ShardingConditions::default()).unwrap();
        assert!(result.routing_units.is_empty());
    }
}
