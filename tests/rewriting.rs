//! End-to-end rewriting: tokens, pagination revision, encrypted columns

mod common;

use common::{insert_order, metadata, select_account, sharding_rule, span_of};
use sqlshard::statement::{
    PaginationSegment, PaginationValueSegment, SelectItemSegment, SelectSegments, SqlStatement,
    StatementKind, TableSegment,
};
use sqlshard::{Error, SqlRewriteEngine, StatementRouter, Value};

#[test]
fn test_logical_tables_become_physical_per_unit() {
    let rule = sharding_rule();
    let metadata = metadata();
    let router = StatementRouter::new(&rule, &metadata);
    let sql = "SELECT * FROM t_order";
    let mut statement = SqlStatement::simple(sql, StatementKind::Select);
    statement.tables = vec![TableSegment::new("t_order", span_of(sql, "t_order"))];
    let route_result = router.route(&statement, &[]).unwrap();
    let engine = SqlRewriteEngine::new(&rule, &statement, &route_result, &[], true).unwrap();
    let units = engine.route_units(&route_result.routing_result);
    assert_eq!(units.len(), 4);
    let mut sqls: Vec<&str> = units.iter().map(|unit| unit.sql_unit.sql.as_str()).collect();
    sqls.sort();
    sqls.dedup();
    assert_eq!(
        sqls,
        vec!["SELECT * FROM t_order_0", "SELECT * FROM t_order_1"]
    );
}

#[test]
fn test_pagination_revised_when_fanning_out() {
    let rule = sharding_rule();
    let metadata = metadata();
    let router = StatementRouter::new(&rule, &metadata);
    let sql = "SELECT * FROM t_order LIMIT ?, ?";
    let mut statement = SqlStatement::simple(sql, StatementKind::Select);
    statement.tables = vec![TableSegment::new("t_order", span_of(sql, "t_order"))];
    statement.select = Some(SelectSegments {
        items: vec![SelectItemSegment::Shorthand {
            owner: None,
            span: span_of(sql, "*"),
        }],
        pagination: Some(PaginationSegment {
            offset: Some(PaginationValueSegment::Parameter { index: 0 }),
            row_count: Some(PaginationValueSegment::Parameter { index: 1 }),
        }),
        ..Default::default()
    });
    let parameters = vec![Value::I64(10), Value::I64(20)];
    let route_result = router.route(&statement, &parameters).unwrap();
    assert!(!route_result.routing_result.is_single_routing());
    let engine = SqlRewriteEngine::new(&rule, &statement, &route_result, &parameters, true).unwrap();
    let unit = &route_result.routing_result.routing_units[0];
    let rewritten = engine.generate_sql(Some(unit));
    // Offset drops to zero, row count widens to offset + row count.
    assert_eq!(rewritten.parameters, vec![Value::I64(0), Value::I64(30)]);
    assert_eq!(
        engine.parameter_builder().original_parameters(),
        &[Value::I64(10), Value::I64(20)]
    );
}

#[test]
fn test_insert_generated_key_written_back() {
    let rule = sharding_rule();
    let metadata = metadata();
    let router = StatementRouter::new(&rule, &metadata);
    let statement = insert_order();
    let parameters = vec![Value::I64(1), Value::Str("init".into())];
    let route_result = router.route(&statement, &parameters).unwrap();
    let engine = SqlRewriteEngine::new(&rule, &statement, &route_result, &parameters, true).unwrap();
    let units = engine.route_units(&route_result.routing_result);
    assert_eq!(units.len(), 1);
    assert_eq!(
        units[0].sql_unit.sql,
        "INSERT INTO t_order_0 (user_id, status, order_id) VALUES (?, ?)"
    );
    assert_eq!(
        units[0].sql_unit.parameters,
        vec![Value::I64(1), Value::Str("init".into()), Value::I64(100)]
    );
}

#[test]
fn test_client_supplied_key_not_written_back() {
    let rule = sharding_rule();
    let metadata = metadata();
    let router = StatementRouter::new(&rule, &metadata);
    let sql = "INSERT INTO t_order (order_id, user_id) VALUES (?, ?)";
    let mut statement = insert_order();
    statement.sql = sql.to_owned();
    statement.tables = vec![TableSegment::new("t_order", span_of(sql, "t_order"))];
    let segments = statement.insert.as_mut().unwrap();
    segments.columns = vec!["order_id".into(), "user_id".into()];
    segments.columns_span = span_of(sql, "(order_id, user_id)");
    let parameters = vec![Value::I64(7), Value::I64(1)];
    let route_result = router.route(&statement, &parameters).unwrap();
    assert!(!route_result.generated_key().unwrap().generated);
    let engine = SqlRewriteEngine::new(&rule, &statement, &route_result, &parameters, true).unwrap();
    let unit = &route_result.routing_result.routing_units[0];
    let rewritten = engine.generate_sql(Some(unit));
    assert_eq!(
        rewritten.sql,
        "INSERT INTO t_order_1 (order_id, user_id) VALUES (?, ?)"
    );
    assert_eq!(rewritten.parameters, parameters);
}

#[test]
fn test_encrypt_rewrite_with_cipher_column() {
    let rule = sharding_rule();
    let metadata = metadata();
    let router = StatementRouter::new(&rule, &metadata);
    let statement = select_account();
    let parameters = vec![Value::Str("secret".into())];
    let route_result = router.route(&statement, &parameters).unwrap();
    assert_eq!(route_result.encrypt_conditions.conditions.len(), 1);
    let engine = SqlRewriteEngine::new(&rule, &statement, &route_result, &parameters, true).unwrap();
    let unit = &route_result.routing_result.routing_units[0];
    let rewritten = engine.generate_sql(Some(unit));
    assert_eq!(
        rewritten.sql,
        "SELECT pwd_cipher FROM t_account WHERE pwd_cipher = ?"
    );
    // The bound value is replaced by its encrypted form at the same position.
    assert_eq!(rewritten.parameters, vec![Value::Str("terces".into())]);
}

#[test]
fn test_encrypt_rewrite_with_plain_column() {
    let rule = sharding_rule();
    let metadata = metadata();
    let router = StatementRouter::new(&rule, &metadata);
    let statement = select_account();
    let parameters = vec![Value::Str("secret".into())];
    let route_result = router.route(&statement, &parameters).unwrap();
    let engine =
        SqlRewriteEngine::new(&rule, &statement, &route_result, &parameters, false).unwrap();
    let unit = &route_result.routing_result.routing_units[0];
    let rewritten = engine.generate_sql(Some(unit));
    assert_eq!(
        rewritten.sql,
        "SELECT pwd_plain FROM t_account WHERE pwd_plain = ?"
    );
    assert_eq!(rewritten.parameters, parameters);
}

#[test]
fn test_plain_mode_without_plain_column_fails() {
    let mut rule = sharding_rule();
    let pwd = sqlshard::rule::EncryptColumn {
        cipher_column: "pwd_cipher".into(),
        assisted_query_column: None,
        plain_column: None,
        encryptor: std::sync::Arc::new(common::ReverseEncryptor),
    };
    rule.encrypt_rule = sqlshard::rule::EncryptRule::new([(
        "t_account".to_string(),
        sqlshard::rule::EncryptTable::new([("pwd".to_string(), pwd)]),
    )]);
    let metadata = metadata();
    let router = StatementRouter::new(&rule, &metadata);
    let statement = select_account();
    let parameters = vec![Value::Str("secret".into())];
    let route_result = router.route(&statement, &parameters).unwrap();
    let result = SqlRewriteEngine::new(&rule, &statement, &route_result, &parameters, false);
    assert!(matches!(
        result,
        Err(Error::PlainColumnRequired { ref table, ref column })
            if table == "t_account" && column == "pwd"
    ));
}

#[test]
fn test_tokens_sorted_and_non_overlapping() {
    let rule = sharding_rule();
    let metadata = metadata();
    let router = StatementRouter::new(&rule, &metadata);
    let statement = select_account();
    let parameters = vec![Value::Str("secret".into())];
    let route_result = router.route(&statement, &parameters).unwrap();
    let engine = SqlRewriteEngine::new(&rule, &statement, &route_result, &parameters, true).unwrap();
    let spans: Vec<_> = engine.tokens().iter().map(|token| token.span()).collect();
    assert!(!spans.is_empty());
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
}
