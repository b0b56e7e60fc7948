//! The scalar operator registry.
//!
//! Operators are looked up by the filter key name and produce a boolean
//! expression over `(table alias, column, value)`. The default set covers the
//! comparison, pattern, list and null operators; callers can register or
//! override entries by name before handing the registry to the compiler,
//! after which it is immutable and shared read-only across compilations.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::filter::Vocabulary;
use crate::sql_ast::{BinaryOp, SqlExpr};

use super::errors::{BuildError, BuildResult};

pub type OperatorFn = dyn Fn(&str, &str, &Value) -> BuildResult<SqlExpr> + Send + Sync;

pub struct OperatorRegistry {
    operators: BTreeMap<String, Box<OperatorFn>>,
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.operators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        OperatorRegistry::with_defaults()
    }
}

impl OperatorRegistry {
    pub fn empty() -> Self {
        OperatorRegistry {
            operators: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = OperatorRegistry::empty();
        registry.register("eq", |t, c, v| {
            Ok(binary(t, c, BinaryOp::Eq, v))
        });
        registry.register("neq", |t, c, v| {
            Ok(binary(t, c, BinaryOp::Neq, v))
        });
        registry.register("gt", |t, c, v| {
            Ok(binary(t, c, BinaryOp::Gt, v))
        });
        registry.register("gte", |t, c, v| {
            Ok(binary(t, c, BinaryOp::Gte, v))
        });
        registry.register("lt", |t, c, v| {
            Ok(binary(t, c, BinaryOp::Lt, v))
        });
        registry.register("lte", |t, c, v| {
            Ok(binary(t, c, BinaryOp::Lte, v))
        });
        registry.register("like", |t, c, v| {
            Ok(binary(t, c, BinaryOp::Like, v))
        });
        registry.register("ilike", |t, c, v| {
            Ok(binary(t, c, BinaryOp::ILike, v))
        });
        registry.register("in", |t, c, v| in_list(t, c, v, false));
        registry.register("notIn", |t, c, v| in_list(t, c, v, true));
        registry.register("isNull", |t, c, v| {
            let is_null = v.as_bool().ok_or_else(|| {
                BuildError::InvalidFilterShape(format!(
                    "isNull on '{}' requires a boolean value",
                    c
                ))
            })?;
            Ok(SqlExpr::IsNull {
                expr: Box::new(SqlExpr::column(t, c)),
                negated: !is_null,
            })
        });
        registry.register("prefix", |t, c, v| {
            pattern(t, c, v, "prefix", |s| format!("{}%", s))
        });
        registry.register("suffix", |t, c, v| {
            pattern(t, c, v, "suffix", |s| format!("%{}", s))
        });
        registry.register("contains", |t, c, v| {
            pattern(t, c, v, "contains", |s| format!("%{}%", s))
        });
        registry
    }

    /// Register an operator, replacing any previous entry of the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, op: F)
    where
        F: Fn(&str, &str, &Value) -> BuildResult<SqlExpr> + Send + Sync + 'static,
    {
        self.operators.insert(name.into(), Box::new(op));
    }

    pub fn get(&self, name: &str) -> Option<&OperatorFn> {
        self.operators.get(name).map(|op| op.as_ref())
    }

    /// Operator names, as the filter classifier's leaf vocabulary.
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::from_names(self.operators.keys().cloned())
    }
}

fn binary(table: &str, column: &str, op: BinaryOp, value: &Value) -> SqlExpr {
    SqlExpr::binary(SqlExpr::column(table, column), op, SqlExpr::Param(value.clone()))
}

fn in_list(table: &str, column: &str, value: &Value, negated: bool) -> BuildResult<SqlExpr> {
    let items = value.as_array().ok_or_else(|| {
        BuildError::InvalidFilterShape(format!(
            "{} on '{}' requires a list value",
            if negated { "notIn" } else { "in" },
            column
        ))
    })?;
    Ok(SqlExpr::InList {
        expr: Box::new(SqlExpr::column(table, column)),
        list: items.iter().cloned().map(SqlExpr::Param).collect(),
        negated,
    })
}

fn pattern(
    table: &str,
    column: &str,
    value: &Value,
    name: &str,
    shape: impl Fn(&str) -> String,
) -> BuildResult<SqlExpr> {
    let text = value.as_str().ok_or_else(|| {
        BuildError::InvalidFilterShape(format!("{} on '{}' requires a string value", name, column))
    })?;
    Ok(SqlExpr::binary(
        SqlExpr::column(table, column),
        BinaryOp::Like,
        SqlExpr::Param(Value::String(shape(text))),
    ))
}
