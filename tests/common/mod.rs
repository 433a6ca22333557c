//! Shared fixtures for routing and rewriting integration tests
#![allow(dead_code)]

use sqlshard::rule::{
    DataNode, DataSourceInfo, EncryptColumn, EncryptRule, EncryptTable, Encryptor,
    IncrementKeyGenerator, ModuloShardingAlgorithm, ShardingStrategy, TableRule,
};
use sqlshard::statement::{
    ColumnSegment, ExpressionSegment, InsertSegments, PredicateOperator, PredicateSegment,
    SelectItemSegment, SelectSegments, Span, SqlStatement, StatementKind, TableSegment,
};
use sqlshard::{ShardingMetadata, ShardingRule, Value};
use std::sync::Arc;

/// Reverses strings so encrypted values are recognizable in assertions.
#[derive(Debug)]
pub struct ReverseEncryptor;

impl Encryptor for ReverseEncryptor {
    fn encrypt(&self, value: &Value) -> Value {
        match value {
            Value::Str(s) => Value::Str(s.chars().rev().collect()),
            other => other.clone(),
        }
    }
}

/// Two data sources, two shards per table. `t_order` and `t_order_item` are
/// bound; `t_config` is broadcast; `t_account` is unruled but carries an
/// encrypted `pwd` column; anything else lands on the default data source.
pub fn sharding_rule() -> ShardingRule {
    let nodes = |table: &str| {
        vec![
            DataNode::new("ds_0", format!("{table}_0")),
            DataNode::new("ds_0", format!("{table}_1")),
            DataNode::new("ds_1", format!("{table}_0")),
            DataNode::new("ds_1", format!("{table}_1")),
        ]
    };
    let mut order = TableRule::new("t_order", nodes("t_order"));
    order.database_strategy = ShardingStrategy::standard("user_id", Arc::new(ModuloShardingAlgorithm));
    order.table_strategy = ShardingStrategy::standard("order_id", Arc::new(ModuloShardingAlgorithm));
    order.generate_key_column = Some("order_id".into());
    order.key_generator = Some(Arc::new(IncrementKeyGenerator::starting_at(100)));

    let mut item = TableRule::new("t_order_item", nodes("t_order_item"));
    item.database_strategy = ShardingStrategy::standard("user_id", Arc::new(ModuloShardingAlgorithm));
    item.table_strategy = ShardingStrategy::standard("order_id", Arc::new(ModuloShardingAlgorithm));

    let pwd = EncryptColumn {
        cipher_column: "pwd_cipher".into(),
        assisted_query_column: None,
        plain_column: Some("pwd_plain".into()),
        encryptor: Arc::new(ReverseEncryptor),
    };
    ShardingRule {
        data_source_names: vec!["ds_0".into(), "ds_1".into()],
        table_rules: vec![order, item],
        binding_table_groups: vec![vec!["t_order".into(), "t_order_item".into()]],
        broadcast_tables: vec!["t_config".into()],
        default_data_source_name: Some("ds_0".into()),
        encrypt_rule: EncryptRule::new([(
            "t_account".to_string(),
            EncryptTable::new([("pwd".to_string(), pwd)]),
        )]),
    }
}

pub fn metadata() -> ShardingMetadata {
    ShardingMetadata {
        data_sources: vec![
            DataSourceInfo::master("ds_0"),
            DataSourceInfo::replica("ds_0_slave"),
            DataSourceInfo::master("ds_1"),
        ],
    }
}

/// Span of the first occurrence of `fragment` in `sql`.
pub fn span_of(sql: &str, fragment: &str) -> Span {
    let start = sql.find(fragment).unwrap_or_else(|| panic!("{fragment:?} not in {sql:?}"));
    Span::new(start, start + fragment.len())
}

/// `SELECT * FROM t_order WHERE user_id = ? AND order_id = ?`.
pub fn select_order() -> SqlStatement {
    let sql = "SELECT * FROM t_order WHERE user_id = ? AND order_id = ?";
    let mut statement = SqlStatement::simple(sql, StatementKind::Select);
    statement.tables = vec![TableSegment::new("t_order", span_of(sql, "t_order"))];
    statement.select = Some(SelectSegments {
        items: vec![SelectItemSegment::Shorthand {
            owner: None,
            span: span_of(sql, "*"),
        }],
        ..Default::default()
    });
    statement.predicates = vec![
        equal_predicate(sql, "user_id", 0),
        equal_predicate(sql, "order_id", 1),
    ];
    statement
}

/// `INSERT INTO t_order (user_id, status) VALUES (?, ?)`.
pub fn insert_order() -> SqlStatement {
    let sql = "INSERT INTO t_order (user_id, status) VALUES (?, ?)";
    let mut statement = SqlStatement::simple(sql, StatementKind::Insert);
    statement.tables = vec![TableSegment::new("t_order", span_of(sql, "t_order"))];
    statement.insert = Some(InsertSegments {
        columns: vec!["user_id".into(), "status".into()],
        columns_span: span_of(sql, "(user_id, status)"),
        rows: vec![vec![
            ExpressionSegment::Parameter(0),
            ExpressionSegment::Parameter(1),
        ]],
    });
    statement
}

/// `SELECT pwd FROM t_account WHERE pwd = ?`.
pub fn select_account() -> SqlStatement {
    let sql = "SELECT pwd FROM t_account WHERE pwd = ?";
    let mut statement = SqlStatement::simple(sql, StatementKind::Select);
    statement.tables = vec![TableSegment::new("t_account", span_of(sql, "t_account"))];
    statement.select = Some(SelectSegments {
        items: vec![SelectItemSegment::Column {
            column: ColumnSegment::new("pwd", span_of(sql, "pwd")),
            alias: None,
        }],
        ..Default::default()
    });
    let predicate_span = span_of(sql, "pwd = ?");
    statement.predicates = vec![PredicateSegment {
        column: ColumnSegment::new(
            "pwd",
            Span::new(predicate_span.start, predicate_span.start + "pwd".len()),
        ),
        operator: PredicateOperator::Equal,
        values: vec![ExpressionSegment::Parameter(0)],
        span: predicate_span,
    }];
    statement
}

fn equal_predicate(sql: &str, column: &str, parameter_index: usize) -> PredicateSegment {
    let fragment = format!("{column} = ?");
    PredicateSegment {
        column: ColumnSegment::new(column, span_of(sql, column)),
        operator: PredicateOperator::Equal,
        values: vec![ExpressionSegment::Parameter(parameter_index)],
        span: span_of(sql, &fragment),
    }
}
