//! Standard routing: one governing sharding table
//!
//! The governing table's database and table strategies are evaluated per
//! sharding condition (or once over all shards when no condition applies);
//! tables bound to the governing table reuse the same shard selection so
//! same-shard joins stay correct.

use super::condition::{RouteValue, ShardingConditions};
use super::{RoutingResult, RoutingUnit, TableUnit};
use crate::error::Result;
use crate::rule::{DataNode, ShardingRule, TableRule};

pub fn route(
    rule: &ShardingRule,
    logic_table: &str,
    table_names: &[String],
    conditions: &ShardingConditions,
) -> Result<RoutingResult> {
    let table_rule = rule.table_rule(logic_table)?;
    let data_nodes = route_data_nodes(table_rule, logic_table, conditions);
    let binding_tables: Vec<&String> = table_names
        .iter()
        .filter(|table| {
            !table.eq_ignore_ascii_case(logic_table) && rule.is_binding_table_of(logic_table, table)
        })
        .collect();
    let mut result = RoutingResult::default();
    for node in data_nodes {
        let mut unit = RoutingUnit::new(node.data_source_name.clone());
        unit.table_units
            .push(TableUnit::new(logic_table, node.table_name.clone()));
        for binding_table in &binding_tables {
            let actual = rule.binding_actual_table(
                &node.data_source_name,
                logic_table,
                &node.table_name,
                binding_table,
            )?;
            unit.table_units.push(TableUnit::new(binding_table.as_str(), actual));
        }
        result.add(unit)?;
    }
    Ok(result)
}

/// The physical nodes selected by the strategies, deduplicated in
/// declaration order.
fn route_data_nodes(
    table_rule: &TableRule,
    logic_table: &str,
    conditions: &ShardingConditions,
) -> Vec<DataNode> {
    let available_data_sources = table_rule.actual_data_source_names();
    let mut result: Vec<DataNode> = Vec::new();
    let condition_values: Vec<Vec<&RouteValue>> = if conditions.conditions.is_empty() {
        vec![Vec::new()]
    } else {
        conditions
            .conditions
            .iter()
            .map(|condition| {
                condition
                    .values
                    .iter()
                    .filter(|value| value.table.eq_ignore_ascii_case(logic_table))
                    .collect()
            })
            .collect()
    };
    for values in condition_values {
        for data_source in table_rule
            .database_strategy
            .do_sharding(&available_data_sources, &values)
        {
            let available_tables = table_rule.actual_table_names(&data_source);
            for table in table_rule.table_strategy.do_sharding(&available_tables, &values) {
                let node = DataNode::new(data_source.clone(), table);
                if !result.contains(&node) {
                    result.push(node);
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::condition::{RouteValueKind, ShardingCondition};
    use crate::rule::{ModuloShardingAlgorithm, ShardingStrategy};
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
        order.database_strategy =
            ShardingStrategy::standard("user_id", Arc::new(ModuloShardingAlgorithm));
        order.table_strategy =
            ShardingStrategy::standard("order_id", Arc::new(ModuloShardingAlgorithm));
        let mut item = TableRule::new("t_order_item", nodes("t_order_item"));
        item.database_strategy =
            ShardingStrategy::standard("user_id", Arc::new(ModuloShardingAlgorithm));
        item.table_strategy =
            ShardingStrategy::standard("order_id", Arc::new(ModuloShardingAlgorithm));
        ShardingRule {
            data_source_names: vec!["ds_0".into(), "ds_1".into()],
            table_rules: vec![order, item],
            binding_table_groups: vec![vec!["t_order".into(), "t_order_item".into()]],
            ..Default::default()
        }
    }

    fn conditions(user_id: i64, order_id: i64) -> ShardingConditions {
        ShardingConditions::new(vec![ShardingCondition {
            values: vec![
                RouteValue {
                    table: "t_order".into(),
                    column: "user_id".into(),
                    kind: RouteValueKind::List(vec![Value::I64(user_id)]),
                },
                RouteValue {
                    table: "t_order".into(),
                    column: "order_id".into(),
                    kind: RouteValueKind::List(vec![Value::I64(order_id)]),
                },
            ],
        }])
    }

    #[test]
    fn test_fully_sharded_single_node() {
        let result = route(&rule(), "t_order", &["t_order".into()], &conditions(1, 2)).unwrap();
        assert_eq!(
            result.routing_units,
            vec![RoutingUnit::with_tables(
                "ds_1",
                vec![TableUnit::new("t_order", "t_order_0")]
            )]
        );
    }

    #[test]
    fn test_no_conditions_routes_all_nodes() {
        let result = route(
            &rule(),
            "t_order",
            &["t_order".into()],
            &ShardingConditions::default(),
        )
        .unwrap();
        assert_eq!(result.routing_units.len(), 4);
    }

    #[test]
    fn test_eleven_shard_topology_routes_one_table() {
        let nodes: Vec<DataNode> = (0..11)
            .map(|i| DataNode::new("ds_0", format!("t_order_{i}")))
            .collect();
        let mut order = TableRule::new("t_order", nodes);
        order.table_strategy =
            ShardingStrategy::standard("order_id", Arc::new(ModuloShardingAlgorithm));
        let rule = ShardingRule {
            data_source_names: vec!["ds_0".into()],
            table_rules: vec![order],
            ..Default::default()
        };
        let conditions = ShardingConditions::new(vec![ShardingCondition {
            values: vec![RouteValue {
                table: "t_order".into(),
                column: "order_id".into(),
                kind: RouteValueKind::List(vec![Value::I64(0)]),
            }],
        }]);
        // Shard 0 alone must answer; t_order_10 shares its last digit only.
        let result = route(&rule, "t_order", &["t_order".into()], &conditions).unwrap();
        assert_eq!(
            result.routing_units,
            vec![RoutingUnit::with_tables(
                "ds_0",
                vec![TableUnit::new("t_order", "t_order_0")]
            )]
        );
    }

    #[test]
    fn test_binding_table_shares_shard_suffix() {
        let tables = vec!["t_order".to_string(), "t_order_item".to_string()];
        let result = route(&rule(), "t_order", &tables, &conditions(1, 3)).unwrap();
        assert_eq!(result.routing_units.len(), 1);
        let unit = &result.routing_units[0];
        assert_eq!(unit.actual_table("t_order"), Some("t_order_1"));
        assert_eq!(unit.actual_table("t_order_item"), Some("t_order_item_1"));
    }
}
