//! Dialect seams for the SQL printer.
//!
//! The expression tree in this module's parent is dialect-neutral; everything
//! that differs between databases (placeholder style, identifier quoting, the
//! JSON function family) goes through this trait.

use std::fmt::Write;

pub trait Dialect {
    /// Positional placeholder for the `n`-th bound argument (1-based).
    fn placeholder(&self, n: usize) -> String;

    /// Quote an identifier, doubling any embedded quote characters.
    fn quote_ident(&self, ident: &str) -> String;

    /// JSON object constructor function.
    fn json_build_object_fn(&self) -> &'static str;

    /// JSON array aggregate function.
    fn json_agg_fn(&self) -> &'static str;

    /// Literal for an empty JSON array, used as the coalesce fallback.
    fn empty_json_array(&self) -> &'static str;

    /// Predicate function testing a JSON path against a document column.
    fn json_path_exists_fn(&self) -> &'static str;

    /// Cast suffix applied to a bound JSON path template.
    fn json_path_cast(&self) -> &'static str;

    /// Cast suffix applied to a bound JSON variable map.
    fn json_vars_cast(&self) -> &'static str;

    /// Infix operator extracting an object key as JSON.
    fn json_get_op(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn placeholder(&self, n: usize) -> String {
        format!("${}", n)
    }

    fn quote_ident(&self, ident: &str) -> String {
        let mut out = String::with_capacity(ident.len() + 2);
        out.push('"');
        for ch in ident.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
        out
    }

    fn json_build_object_fn(&self) -> &'static str {
        "jsonb_build_object"
    }

    fn json_agg_fn(&self) -> &'static str {
        "jsonb_agg"
    }

    fn empty_json_array(&self) -> &'static str {
        "'[]'::jsonb"
    }

    fn json_path_exists_fn(&self) -> &'static str {
        "jsonb_path_exists"
    }

    fn json_path_cast(&self) -> &'static str {
        "::jsonpath"
    }

    fn json_vars_cast(&self) -> &'static str {
        "::jsonb"
    }

    fn json_get_op(&self) -> &'static str {
        "->"
    }
}

/// Render a qualified table reference (`"schema"."table"`).
pub(crate) fn write_table(
    out: &mut String,
    dialect: &dyn Dialect,
    table: &crate::catalog::TableRef,
) {
    if let Some(schema) = &table.schema {
        let _ = write!(out, "{}.", dialect.quote_ident(schema));
    }
    let _ = write!(out, "{}", dialect.quote_ident(&table.name));
}
