//! JSON path filter compilation.
//!
//! Structured filter maps over JSON document columns compile into PostgreSQL
//! path templates of the form `$ ? (@.price > $v0 && @.color == $v1)` plus a
//! variable map `{v0: 10, v1: "red"}`. The template and variables are bound
//! separately by the SQL layer (`jsonb_path_exists(col, $1::jsonpath,
//! $2::jsonb)`), so user values never appear in the template text. Field
//! paths are the only client strings that do, and they must pass the
//! [`validate_path`] whitelist first.
//!
//! Array quantifiers: `any` compiles to a wildcard element path (existential
//! matching is the native behavior), `all` compiles to the negation of `any`
//! over the inverted condition. Operators without an inverse (the pattern
//! family) are rejected under `all`.

mod compiler;
mod errors;
pub mod expr;
mod path;

pub use errors::JsonPathError;
pub use expr::{escape_regex_literal, like_pattern_to_regex, JsonPathOp};
pub use path::validate_path;

use crate::filter::{FieldFilter, FilterMap};
use crate::selection::JsonMap;

/// A compiled path predicate: the template text and its bound variables.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledJsonPath {
    pub template: String,
    pub vars: JsonMap,
}

/// Compile a classified filter map rooted at a JSON document column.
pub fn compile(filter: &FilterMap) -> Result<CompiledJsonPath, JsonPathError> {
    let predicate = compiler::compile_map("", filter, false)?;
    let (template, vars) = expr::render(&predicate);
    Ok(CompiledJsonPath { template, vars })
}

/// Compile a field filter (operator map or nested map) rooted at the
/// document itself, for JSON columns holding scalars or arrays.
pub fn compile_field_filter(filter: &FieldFilter) -> Result<CompiledJsonPath, JsonPathError> {
    let predicate = compiler::compile_field("", filter, false)?;
    let (template, vars) = expr::render(&predicate);
    Ok(CompiledJsonPath { template, vars })
}
