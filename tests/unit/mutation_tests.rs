//! Mutation compilation: CTE-wrapped statements with payload selection
//! over the returned rows.

use graphsql::selection::SelectionNode;
use graphsql::BuildError;
use serde_json::json;

use crate::fixtures;

#[test]
fn create_inserts_every_record_and_selects_the_payload() {
    let node = SelectionNode::relation(
        "createPost",
        "Post",
        vec![
            SelectionNode::scalar("rows_affected"),
            SelectionNode::relation("posts", "Post", vec![SelectionNode::scalar("id")]),
        ],
    )
    .with_input(json!([
        {"name": "a", "views": 3},
        {"name": "b"}
    ]));
    let query = fixtures::compiler().compile_create(&node).unwrap();
    assert_eq!(
        query.sql,
        r#"WITH "create_post" AS (INSERT INTO "posts" ("name", "views") VALUES ($1, $2), ($3, NULL) RETURNING *) SELECT (SELECT coalesce(jsonb_agg(jsonb_build_object('id', "t0"."id")), '[]'::jsonb) AS "posts" FROM "create_post" AS "t0") AS "posts", (SELECT count(*) FROM "create_post") AS "rows_affected""#
    );
    assert_eq!(query.args, vec![json!("a"), json!(3), json!("b")]);
}

#[test]
fn create_without_input_errors() {
    let node = SelectionNode::relation(
        "createPost",
        "Post",
        vec![SelectionNode::scalar("rows_affected")],
    );
    let err = fixtures::compiler().compile_create(&node).unwrap_err();
    assert!(matches!(err, BuildError::MissingInput(_)), "unexpected error: {:?}", err);
}

#[test]
fn create_rejects_non_record_input() {
    let node = SelectionNode::relation(
        "createPost",
        "Post",
        vec![SelectionNode::scalar("rows_affected")],
    )
    .with_input(json!(5));
    let err = fixtures::compiler().compile_create(&node).unwrap_err();
    assert!(matches!(err, BuildError::InvalidInput(_)), "unexpected error: {:?}", err);
}

#[test]
fn update_sets_sorted_assignments_under_the_filter() {
    let node = SelectionNode::relation(
        "updatePost",
        "Post",
        vec![SelectionNode::scalar("rows_affected")],
    )
    .with_input(json!({"name": "x", "views": 1}))
    .with_filter(fixtures::filter(json!({"id": {"eq": 7}})));
    let query = fixtures::compiler().compile_update(&node).unwrap();
    assert_eq!(
        query.sql,
        r#"WITH "update_post" AS (UPDATE "posts" AS "t0" SET "name" = $1, "views" = $2 WHERE "t0"."id" = $3 RETURNING *) SELECT (SELECT count(*) FROM "update_post") AS "rows_affected""#
    );
    assert_eq!(query.args, vec![json!("x"), json!(1), json!(7)]);
}

#[test]
fn update_takes_exactly_one_record() {
    let node = SelectionNode::relation(
        "updatePost",
        "Post",
        vec![SelectionNode::scalar("rows_affected")],
    )
    .with_input(json!([{"name": "x"}, {"name": "y"}]));
    let err = fixtures::compiler().compile_update(&node).unwrap_err();
    assert!(matches!(err, BuildError::InvalidInput(_)), "unexpected error: {:?}", err);
}

#[test]
fn delete_filters_by_table_name() {
    let node = SelectionNode::relation(
        "deletePost",
        "Post",
        vec![SelectionNode::scalar("rows_affected")],
    )
    .with_filter(fixtures::filter(json!({"views": {"lt": 1}})));
    let query = fixtures::compiler().compile_delete(&node).unwrap();
    assert_eq!(
        query.sql,
        r#"WITH "delete_post" AS (DELETE FROM "posts" WHERE "posts"."views" < $1 RETURNING *) SELECT (SELECT count(*) FROM "delete_post") AS "rows_affected""#
    );
    assert_eq!(query.args, vec![json!(1)]);
}

#[test]
fn delete_without_filter_has_no_where_clause() {
    let node = SelectionNode::relation(
        "deletePost",
        "Post",
        vec![SelectionNode::scalar("rows_affected")],
    );
    let query = fixtures::compiler().compile_delete(&node).unwrap();
    assert!(!query.sql.contains("WHERE"), "unexpected sql: {}", query.sql);
}

#[test]
fn mutations_require_a_payload_selection() {
    let node = SelectionNode::relation("deletePost", "Post", vec![]);
    let err = fixtures::compiler().compile_delete(&node).unwrap_err();
    assert!(
        matches!(err, BuildError::EmptySelection(_)),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn payload_without_rows_affected_omits_the_count() {
    let node = SelectionNode::relation(
        "deletePost",
        "Post",
        vec![SelectionNode::relation("posts", "Post", vec![SelectionNode::scalar("id")])],
    );
    let query = fixtures::compiler().compile_delete(&node).unwrap();
    assert!(!query.sql.contains("rows_affected"), "unexpected sql: {}", query.sql);
    assert!(query.sql.contains(r#"FROM "delete_post" AS "t0""#));
}
