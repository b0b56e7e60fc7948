//! Filter compilation: scalar operators, logical grouping, relation
//! predicates and JSON path templates, plus the injection guarantees.

use graphsql::filter::FilterError;
use graphsql::query_builder::OperatorRegistry;
use graphsql::selection::SelectionNode;
use graphsql::sql_ast::{BinaryOp, SqlExpr};
use graphsql::BuildError;
use serde_json::json;

use crate::fixtures;

fn users(filter: serde_json::Value) -> SelectionNode {
    SelectionNode::relation("users", "User", vec![SelectionNode::scalar("id")])
        .with_filter(fixtures::filter(filter))
}

fn posts(filter: serde_json::Value) -> SelectionNode {
    SelectionNode::relation("posts", "Post", vec![SelectionNode::scalar("id")])
        .with_filter(fixtures::filter(filter))
}

#[test]
fn scalar_equality_binds_the_value() {
    let query = fixtures::compiler()
        .compile_query(&users(json!({"fullName": {"eq": "Alice"}})))
        .unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "t0"."id" AS "id" FROM "users" AS "t0" WHERE "t0"."full_name" = $1 LIMIT $2"#
    );
    assert_eq!(query.args, vec![json!("Alice"), json!(100)]);
}

#[test]
fn operators_on_one_field_combine_with_and() {
    let query = fixtures::compiler()
        .compile_query(&posts(json!({"views": {"gte": 10, "lt": 100}})))
        .unwrap();
    assert!(
        query
            .sql
            .contains(r#"WHERE ("t0"."views" >= $1 AND "t0"."views" < $2)"#),
        "unexpected sql: {}",
        query.sql
    );
    assert_eq!(query.args, vec![json!(10), json!(100), json!(100)]);
}

#[test]
fn sibling_fields_sort_lexicographically() {
    let query = fixtures::compiler()
        .compile_query(&posts(json!({"views": {"in": [1, 2]}, "name": {"isNull": true}})))
        .unwrap();
    assert!(
        query
            .sql
            .contains(r#"WHERE ("t0"."name" IS NULL AND "t0"."views" IN ($1, $2))"#),
        "unexpected sql: {}",
        query.sql
    );
    assert_eq!(query.args, vec![json!(1), json!(2), json!(100)]);
}

#[test]
fn or_groups_parenthesize() {
    let query = fixtures::compiler()
        .compile_query(&posts(json!({
            "OR": [{"name": {"eq": "a"}}, {"views": {"gt": 5}}]
        })))
        .unwrap();
    assert!(
        query
            .sql
            .contains(r#"WHERE ("t0"."name" = $1 OR "t0"."views" > $2)"#),
        "unexpected sql: {}",
        query.sql
    );
}

#[test]
fn not_wraps_its_group() {
    let query = fixtures::compiler()
        .compile_query(&posts(json!({"NOT": {"name": {"eq": "a"}}})))
        .unwrap();
    assert!(
        query.sql.contains(r#"WHERE NOT ("t0"."name" = $1)"#),
        "unexpected sql: {}",
        query.sql
    );
}

#[test]
fn compilation_is_deterministic_under_key_reordering() {
    let compiler = fixtures::compiler();
    let mut reversed = graphsql::selection::JsonMap::new();
    reversed.insert("views".to_string(), json!({"gt": 5}));
    reversed.insert("name".to_string(), json!({"eq": "a"}));
    let forward = compiler
        .compile_query(&posts(json!({"name": {"eq": "a"}, "views": {"gt": 5}})))
        .unwrap();
    let backward = compiler
        .compile_query(
            &SelectionNode::relation("posts", "Post", vec![SelectionNode::scalar("id")])
                .with_filter(reversed),
        )
        .unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn one_to_many_relation_filter_compiles_to_exists() {
    let query = fixtures::compiler()
        .compile_query(&users(json!({"posts": {"name": {"eq": "intro"}}})))
        .unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "t0"."id" AS "id" FROM "users" AS "t0" WHERE EXISTS (SELECT 1 FROM "posts" AS "t1" WHERE ("t0"."id" = "t1"."author_id" AND "t1"."name" = $1)) LIMIT $2"#
    );
    assert_eq!(query.args, vec![json!("intro"), json!(100)]);
}

#[test]
fn many_to_many_relation_filter_joins_the_junction() {
    let query = fixtures::compiler()
        .compile_query(&users(json!({"roles": {"name": {"eq": "admin"}}})))
        .unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "t0"."id" AS "id" FROM "users" AS "t0" WHERE EXISTS (SELECT 1 FROM "roles" AS "t1" INNER JOIN "user_roles" AS "t2" ON ("t0"."id" = "t2"."user_id" AND "t2"."role_id" = "t1"."id") WHERE "t1"."name" = $1) LIMIT $2"#
    );
}

#[test]
fn relation_filters_require_a_nested_map() {
    let err = fixtures::compiler()
        .compile_query(&users(json!({"posts": {"eq": 1}})))
        .unwrap_err();
    assert!(
        matches!(err, BuildError::InvalidFilterShape(_)),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn json_filters_compile_to_path_templates() {
    let query = fixtures::compiler()
        .compile_query(&posts(json!({"metadata": {"brand": {"eq": "acme"}}})))
        .unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "t0"."id" AS "id" FROM "posts" AS "t0" WHERE jsonb_path_exists("t0"."metadata", $1::jsonpath, $2::jsonb) LIMIT $3"#
    );
    assert_eq!(
        query.args,
        vec![json!("$ ? (@.brand == $v0)"), json!({"v0": "acme"}), json!(100)]
    );
}

#[test]
fn json_array_quantifier_uses_a_wildcard_step() {
    let query = fixtures::compiler()
        .compile_query(&posts(json!({"metadata": {"tags": {"any": {"eq": "rust"}}}})))
        .unwrap();
    assert_eq!(query.args[0], json!("$ ? (@.tags[*] == $v0)"));
    assert_eq!(query.args[1], json!({"v0": "rust"}));
}

#[test]
fn lone_is_null_on_a_json_column_tests_the_column() {
    let query = fixtures::compiler()
        .compile_query(&posts(json!({"metadata": {"isNull": true}})))
        .unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "t0"."id" AS "id" FROM "posts" AS "t0" WHERE "t0"."metadata" IS NULL LIMIT $1"#
    );
    assert_eq!(query.args, vec![json!(100)]);
}

#[test]
fn universal_quantifier_rejects_pattern_operators() {
    let err = fixtures::compiler()
        .compile_query(&posts(json!({
            "metadata": {"items": {"all": {"name": {"like": "x%"}}}}
        })))
        .unwrap_err();
    assert!(
        matches!(err, BuildError::JsonPath(_)),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn array_quantifiers_are_json_only() {
    let err = fixtures::compiler()
        .compile_query(&posts(json!({"views": {"any": {"eq": 1}}})))
        .unwrap_err();
    assert!(
        matches!(err, BuildError::InvalidFilterShape(_)),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn mixed_operator_and_field_maps_are_rejected() {
    let err = fixtures::compiler()
        .compile_query(&posts(json!({
            "name": {"eq": "a", "nested": {"eq": "b"}}
        })))
        .unwrap_err();
    assert!(
        matches!(err, BuildError::Filter(FilterError::MixedFilterMap(_))),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn hostile_values_never_reach_the_sql_text() {
    let hostile = "'; DROP TABLE posts; --";
    let query = fixtures::compiler()
        .compile_query(&posts(json!({"name": {"eq": hostile}})))
        .unwrap();
    assert!(!query.sql.contains("DROP"), "unexpected sql: {}", query.sql);
    assert_eq!(query.args[0], json!(hostile));

    let query = fixtures::compiler()
        .compile_query(&posts(json!({"metadata": {"brand": {"eq": hostile}}})))
        .unwrap();
    assert!(!query.sql.contains("DROP"), "unexpected sql: {}", query.sql);
    assert_eq!(query.args[1], json!({ "v0": hostile }));
}

#[test]
fn custom_operators_extend_the_registry() {
    let mut registry = OperatorRegistry::with_defaults();
    registry.register("between", |table, column, value| {
        let bounds = value.as_array().expect("between takes a two-item list");
        Ok(SqlExpr::And(vec![
            SqlExpr::binary(
                SqlExpr::column(table, column),
                BinaryOp::Gte,
                SqlExpr::Param(bounds[0].clone()),
            ),
            SqlExpr::binary(
                SqlExpr::column(table, column),
                BinaryOp::Lte,
                SqlExpr::Param(bounds[1].clone()),
            ),
        ]))
    });
    let compiler = fixtures::compiler().with_operators(registry);
    let query = compiler
        .compile_query(&posts(json!({"views": {"between": [10, 20]}})))
        .unwrap();
    assert!(
        query
            .sql
            .contains(r#"WHERE ("t0"."views" >= $1 AND "t0"."views" <= $2)"#),
        "unexpected sql: {}",
        query.sql
    );
    assert_eq!(query.args, vec![json!(10), json!(20), json!(100)]);
}
