//! Classified filter maps into predicate trees.
//!
//! The `invert` flag threads the `all` quantifier's De Morgan rewrite through
//! the whole sub-tree: leaves substitute their inverse operator, `&&` and `||`
//! swap, and the caller wraps the result in a single negation. "Every element
//! satisfies P" therefore compiles as "no element satisfies not-P", which is
//! the only universal form PostgreSQL path predicates can express.

use crate::filter::{FieldFilter, FilterMap, FilterNode, OperatorEntry};
use serde_json::Value;

use super::expr::{
    escape_regex_literal, like_pattern_to_regex, Condition, Connective, JsonPathOp, Predicate,
};
use super::path::validate_path;
use super::JsonPathError;

pub(super) fn compile_map(
    prefix: &str,
    map: &FilterMap,
    invert: bool,
) -> Result<Predicate, JsonPathError> {
    let mut children = Vec::with_capacity(map.entries.len());
    for entry in &map.entries {
        children.push(compile_node(prefix, entry, invert)?);
    }
    Ok(Predicate::Group {
        connective: connective(Connective::And, invert),
        children,
        negated: false,
    })
}

fn compile_node(
    prefix: &str,
    node: &FilterNode,
    invert: bool,
) -> Result<Predicate, JsonPathError> {
    match node {
        FilterNode::And(maps) => compile_list(prefix, maps, Connective::And, invert),
        FilterNode::Or(maps) => compile_list(prefix, maps, Connective::Or, invert),
        FilterNode::Not(inner) => {
            if invert {
                // Double negation cancels.
                compile_map(prefix, inner, false)
            } else {
                Ok(Predicate::negated(compile_map(prefix, inner, false)?))
            }
        }
        FilterNode::Field { name, filter } => {
            validate_path(name)?;
            let path = join_path(prefix, name);
            compile_field(&path, filter, invert)
        }
    }
}

fn compile_list(
    prefix: &str,
    maps: &[FilterMap],
    base: Connective,
    invert: bool,
) -> Result<Predicate, JsonPathError> {
    if maps.is_empty() {
        return Err(JsonPathError::EmptyFilter);
    }
    let mut children = Vec::with_capacity(maps.len());
    for map in maps {
        children.push(compile_map(prefix, map, invert)?);
    }
    Ok(Predicate::Group {
        connective: connective(base, invert),
        children,
        negated: false,
    })
}

pub(super) fn compile_field(
    path: &str,
    filter: &FieldFilter,
    invert: bool,
) -> Result<Predicate, JsonPathError> {
    match filter {
        FieldFilter::Nested(map) => compile_map(path, map, invert),
        FieldFilter::Operators(entries) => {
            let mut children = Vec::with_capacity(entries.len());
            for entry in entries {
                children.push(compile_operator(path, entry, invert)?);
            }
            Ok(Predicate::Group {
                connective: connective(Connective::And, invert),
                children,
                negated: false,
            })
        }
    }
}

fn compile_operator(
    path: &str,
    entry: &OperatorEntry,
    invert: bool,
) -> Result<Predicate, JsonPathError> {
    match entry {
        OperatorEntry::Op { name, value } => compile_leaf(path, name, value, invert),
        OperatorEntry::Any(body) => {
            let element = element_path(path);
            if invert {
                // not(any(P)): no element satisfies P.
                Ok(Predicate::negated(compile_field(&element, body, false)?))
            } else {
                compile_field(&element, body, false)
            }
        }
        OperatorEntry::All(body) => {
            let element = element_path(path);
            if invert {
                // not(all(P)) = any(not(P)).
                compile_field(&element, body, true)
            } else {
                Ok(Predicate::negated(compile_field(&element, body, true)?))
            }
        }
    }
}

fn compile_leaf(
    path: &str,
    name: &str,
    value: &Value,
    invert: bool,
) -> Result<Predicate, JsonPathError> {
    if name == "isNull" {
        let flag = value.as_bool().ok_or(JsonPathError::NullFlagNotBoolean)?;
        return Ok(Predicate::Leaf(Condition::Null {
            path: path.to_string(),
            is_null: flag != invert,
        }));
    }

    if let Some(op) = JsonPathOp::from_name(name) {
        let op = if invert { op.inverse() } else { op };
        return Ok(Predicate::Leaf(Condition::Compare {
            path: path.to_string(),
            op,
            value: value.clone(),
        }));
    }

    if !matches!(name, "like" | "ilike" | "prefix" | "suffix" | "contains") {
        return Err(JsonPathError::UnsupportedOperator(name.to_string()));
    }
    if invert {
        // Pattern matches have no registered inverse.
        return Err(JsonPathError::UnsupportedQuantifier(name.to_string()));
    }
    let (pattern, case_insensitive) = match name {
        "like" => (like_pattern_to_regex(pattern_value(name, value)?), false),
        "ilike" => (like_pattern_to_regex(pattern_value(name, value)?), true),
        "prefix" => (
            format!("^{}", escape_regex_literal(pattern_value(name, value)?)),
            false,
        ),
        "suffix" => (
            format!("{}$", escape_regex_literal(pattern_value(name, value)?)),
            false,
        ),
        _ => (escape_regex_literal(pattern_value(name, value)?), false),
    };
    Ok(Predicate::Leaf(Condition::Regex {
        path: path.to_string(),
        pattern,
        case_insensitive,
    }))
}

fn pattern_value<'a>(name: &str, value: &'a Value) -> Result<&'a str, JsonPathError> {
    value
        .as_str()
        .ok_or_else(|| JsonPathError::PatternNotString(name.to_string()))
}

fn connective(base: Connective, invert: bool) -> Connective {
    match (base, invert) {
        (Connective::And, false) | (Connective::Or, true) => Connective::And,
        _ => Connective::Or,
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Wildcard element access under `path`; at the document root the wildcard
/// applies to the document itself.
fn element_path(path: &str) -> String {
    format!("{}[*]", path)
}
