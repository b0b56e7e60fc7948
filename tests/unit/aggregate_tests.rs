//! Aggregate compilation: root aggregates, grouping, and relation
//! aggregates attached laterally to their parent.

use graphsql::selection::SelectionNode;
use graphsql::BuildError;
use serde_json::json;

use crate::fixtures;

#[test]
fn root_aggregate_selects_count_and_reducers() {
    let node = SelectionNode::aggregate(
        "postsAggregate",
        "Post",
        vec![
            SelectionNode::scalar("count"),
            SelectionNode::object("sum", vec![SelectionNode::scalar("views")]),
        ],
    );
    let query = fixtures::compiler().compile_query(&node).unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT count(1) AS "count", json_build_object('views', sum("t0"."views")) AS "sum" FROM "posts" AS "t0""#
    );
    assert!(query.args.is_empty());
}

#[test]
fn group_selection_adds_group_by_keys() {
    let node = SelectionNode::aggregate(
        "postsAggregate",
        "Post",
        vec![SelectionNode::scalar("count"), SelectionNode::scalar("group")],
    )
    .with_group_by(vec!["category".to_string()]);
    let query = fixtures::compiler().compile_query(&node).unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT count(1) AS "count", json_build_object('category', "t0"."category") AS "group" FROM "posts" AS "t0" GROUP BY "t0"."category""#
    );
}

#[test]
fn group_without_keys_is_skipped() {
    let node = SelectionNode::aggregate(
        "postsAggregate",
        "Post",
        vec![SelectionNode::scalar("count"), SelectionNode::scalar("group")],
    );
    let query = fixtures::compiler().compile_query(&node).unwrap();
    assert!(!query.sql.contains("GROUP BY"), "unexpected sql: {}", query.sql);
    assert!(!query.sql.contains("json_build_object"));
}

#[test]
fn aggregates_accept_filters_and_skip_the_default_limit() {
    let node = SelectionNode::aggregate("postsAggregate", "Post", vec![SelectionNode::scalar("count")])
        .with_filter(fixtures::filter(json!({"views": {"gt": 10}})));
    let query = fixtures::compiler().compile_query(&node).unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT count(1) AS "count" FROM "posts" AS "t0" WHERE "t0"."views" > $1"#
    );
    assert_eq!(query.args, vec![json!(10)]);
}

#[test]
fn empty_aggregate_selections_are_rejected() {
    let node = SelectionNode::aggregate("postsAggregate", "Post", vec![]);
    let err = fixtures::compiler().compile_query(&node).unwrap_err();
    assert!(
        matches!(err, BuildError::EmptySelection(_)),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn group_only_aggregate_without_keys_is_rejected() {
    let node = SelectionNode::aggregate("postsAggregate", "Post", vec![SelectionNode::scalar("group")]);
    let err = fixtures::compiler().compile_query(&node).unwrap_err();
    assert!(
        matches!(err, BuildError::EmptySelection(_)),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn unknown_aggregate_selections_error() {
    let node =
        SelectionNode::aggregate("postsAggregate", "Post", vec![SelectionNode::scalar("median")]);
    let err = fixtures::compiler().compile_query(&node).unwrap_err();
    assert!(
        matches!(err, BuildError::UnknownAggregate(ref name) if name == "median"),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn one_to_many_relation_aggregate_attaches_laterally() {
    let node = SelectionNode::relation(
        "users",
        "User",
        vec![
            SelectionNode::scalar("id"),
            SelectionNode::aggregate("_postsAggregate", "Post", vec![SelectionNode::scalar("count")]),
        ],
    );
    let query = fixtures::compiler().compile_query(&node).unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "t0"."id" AS "id", "t2"."_postsAggregate" AS "_postsAggregate" FROM "users" AS "t0" LEFT JOIN LATERAL (SELECT coalesce(jsonb_agg("t1"."_postsAggregate"), '[]'::jsonb) AS "_postsAggregate" FROM (SELECT jsonb_build_object('count', count(1)) AS "_postsAggregate" FROM "posts" AS "t1" WHERE "t0"."id" = "t1"."author_id") AS "t1") AS "t2" ON true LIMIT $1"#
    );
}

#[test]
fn many_to_many_relation_aggregate_joins_the_junction() {
    let node = SelectionNode::relation(
        "users",
        "User",
        vec![SelectionNode::aggregate(
            "_rolesAggregate",
            "Role",
            vec![SelectionNode::scalar("count")],
        )],
    );
    let query = fixtures::compiler().compile_query(&node).unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "t3"."_rolesAggregate" AS "_rolesAggregate" FROM "users" AS "t0" CROSS JOIN LATERAL (SELECT coalesce(jsonb_agg("t1"."_rolesAggregate"), '[]'::jsonb) AS "_rolesAggregate" FROM (SELECT jsonb_build_object('count', count(1)) AS "_rolesAggregate" FROM "roles" AS "t1" INNER JOIN "user_roles" AS "t2" ON ("t0"."id" = "t2"."user_id" AND "t2"."role_id" = "t1"."id")) AS "t1") AS "t3" LIMIT $1"#
    );
}

#[test]
fn relation_aggregates_require_the_naming_convention() {
    let node = SelectionNode::relation(
        "users",
        "User",
        vec![SelectionNode::aggregate("postsTotal", "Post", vec![SelectionNode::scalar("count")])],
    );
    let err = fixtures::compiler().compile_query(&node).unwrap_err();
    assert!(
        matches!(err, BuildError::UnsupportedFieldKind(_)),
        "unexpected error: {:?}",
        err
    );
}
