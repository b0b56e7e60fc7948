//! graphsql - a relational query compiler for GraphQL-style selection trees
//!
//! This crate compiles resolved selection trees into parameterized PostgreSQL:
//! - Relations become lateral correlated sub-queries returning JSON objects
//!   or arrays per cardinality, junction tables included
//! - Filter maps compile to boolean SQL through a pluggable operator registry
//! - JSON document columns filter through safely parameterized path templates,
//!   including `any`/`all` array quantifiers
//! - Aggregates and CTE-wrapped mutations share the same machinery
//!
//! The compiler is a pure library: it consumes a [`selection::SelectionNode`]
//! tree plus an immutable [`catalog::Catalog`] and produces a
//! [`sql_ast::Query`] (SQL text and ordered arguments) for a driver to
//! execute. It performs no I/O and holds no mutable state across calls.
//!
//! ```
//! use graphsql::catalog::{Catalog, Entity, FieldDef, TableRef};
//! use graphsql::query_builder::QueryCompiler;
//! use graphsql::selection::SelectionNode;
//!
//! let catalog = Catalog::new()
//!     .with_entity(
//!         Entity::new("User", TableRef::new("users"))
//!             .with_field("id", FieldDef::scalar())
//!             .with_field("fullName", FieldDef::scalar()),
//!     )
//!     .unwrap();
//! let compiler = QueryCompiler::new(catalog);
//!
//! let node = SelectionNode::relation(
//!     "users",
//!     "User",
//!     vec![SelectionNode::scalar("id"), SelectionNode::scalar("fullName")],
//! );
//! let query = compiler.compile_query(&node).unwrap();
//! assert!(query.sql.starts_with("SELECT"));
//! ```

pub mod catalog;
pub mod filter;
pub mod jsonpath;
pub mod query_builder;
pub mod selection;
pub mod sql_ast;
pub mod utils;

pub use catalog::{Catalog, CatalogError, Entity, TableRef};
pub use query_builder::{BuildError, BuildResult, OperatorRegistry, QueryCompiler};
pub use selection::SelectionNode;
pub use sql_ast::Query;
