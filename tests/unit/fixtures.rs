//! Shared catalog fixture: a small blog schema covering every relation
//! cardinality plus JSON document columns.

use graphsql::catalog::{
    Cardinality, Catalog, Entity, FieldDef, JunctionTable, RelationDescriptor, TableRef,
};
use graphsql::query_builder::QueryCompiler;
use graphsql::selection::JsonMap;
use serde_json::Value;

pub fn catalog() -> Catalog {
    let posts = RelationDescriptor {
        target: "Post".to_string(),
        cardinality: Cardinality::OneToMany,
        local_keys: vec!["id".to_string()],
        referenced_keys: vec!["author_id".to_string()],
        junction: None,
    };
    let author = RelationDescriptor {
        target: "User".to_string(),
        cardinality: Cardinality::OneToOne,
        local_keys: vec!["author_id".to_string()],
        referenced_keys: vec!["id".to_string()],
        junction: None,
    };
    let roles = RelationDescriptor {
        target: "Role".to_string(),
        cardinality: Cardinality::ManyToMany,
        local_keys: vec!["id".to_string()],
        referenced_keys: vec!["id".to_string()],
        junction: Some(JunctionTable {
            table: "user_roles".to_string(),
            local_keys: vec!["user_id".to_string()],
            referenced_keys: vec!["role_id".to_string()],
        }),
    };

    Catalog::new()
        .with_entity(
            Entity::new("User", TableRef::new("users"))
                .with_field("id", FieldDef::scalar())
                .with_field("fullName", FieldDef::scalar())
                .with_field("profile", FieldDef::json())
                .with_field("posts", FieldDef::relation(posts))
                .with_field("roles", FieldDef::relation(roles)),
        )
        .unwrap()
        .with_entity(
            Entity::new("Post", TableRef::new("posts"))
                .with_field("id", FieldDef::scalar())
                .with_field("name", FieldDef::scalar())
                .with_field("views", FieldDef::scalar())
                .with_field("category", FieldDef::scalar())
                .with_field("metadata", FieldDef::json())
                .with_field("author", FieldDef::relation(author)),
        )
        .unwrap()
        .with_entity(
            Entity::new("Role", TableRef::new("roles"))
                .with_field("id", FieldDef::scalar())
                .with_field("name", FieldDef::scalar()),
        )
        .unwrap()
}

pub fn compiler() -> QueryCompiler {
    // RUST_LOG=debug surfaces the per-step build logs when a test fails.
    let _ = env_logger::builder().is_test(true).try_init();
    QueryCompiler::new(catalog())
}

pub fn filter(value: Value) -> JsonMap {
    value
        .as_object()
        .expect("filter fixture must be an object")
        .clone()
}
