//! Predicate tree and template rendering.
//!
//! The compiler builds a [`Predicate`] tree first and renders it in a second
//! pass. Rendering assigns variable names (`v0`, `v1`, ...) in tree order, so
//! the names in the template always line up with the returned variable map.

use serde_json::Value;

use crate::selection::JsonMap;

/// Comparison operators expressible as native JSON path binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonPathOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl JsonPathOp {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(JsonPathOp::Eq),
            "neq" => Some(JsonPathOp::Neq),
            "gt" => Some(JsonPathOp::Gt),
            "gte" => Some(JsonPathOp::Gte),
            "lt" => Some(JsonPathOp::Lt),
            "lte" => Some(JsonPathOp::Lte),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            JsonPathOp::Eq => "==",
            JsonPathOp::Neq => "!=",
            JsonPathOp::Gt => ">",
            JsonPathOp::Gte => ">=",
            JsonPathOp::Lt => "<",
            JsonPathOp::Lte => "<=",
        }
    }

    /// The operator whose acceptance set is the complement of this one's.
    pub fn inverse(self) -> Self {
        match self {
            JsonPathOp::Eq => JsonPathOp::Neq,
            JsonPathOp::Neq => JsonPathOp::Eq,
            JsonPathOp::Gt => JsonPathOp::Lte,
            JsonPathOp::Lte => JsonPathOp::Gt,
            JsonPathOp::Gte => JsonPathOp::Lt,
            JsonPathOp::Lt => JsonPathOp::Gte,
        }
    }
}

/// A single leaf condition at a document path.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `@.path op $vN`; the value is bound, never inlined.
    Compare {
        path: String,
        op: JsonPathOp,
        value: Value,
    },
    /// `@.path == null` / `@.path != null`. Binds nothing.
    Null { path: String, is_null: bool },
    /// `@.path like_regex "pattern"`. The pattern is compiler-built from an
    /// escaped value and carries no unescaped metacharacters.
    Regex {
        path: String,
        pattern: String,
        case_insensitive: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf(Condition),
    Group {
        connective: Connective,
        children: Vec<Predicate>,
        negated: bool,
    },
}

impl Predicate {
    pub fn all_of(children: Vec<Predicate>) -> Self {
        Predicate::Group {
            connective: Connective::And,
            children,
            negated: false,
        }
    }

    pub fn negated(child: Predicate) -> Self {
        Predicate::Group {
            connective: Connective::And,
            children: vec![child],
            negated: true,
        }
    }
}

/// Escape a literal value for use inside a `like_regex` pattern.
///
/// Two layers apply: regex metacharacters are neutralized, and the result must
/// survive the JSON path string literal syntax, where backslashes are doubled
/// and double quotes escaped.
pub fn escape_regex_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\\\\\"),
            '"' => out.push_str("\\\""),
            '.' | '^' | '$' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' => {
                out.push_str("\\\\");
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Translate a SQL `LIKE` pattern into an anchored regex, escaping everything
/// except the `%` and `_` wildcards.
pub fn like_pattern_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => out.push_str("\\\\\\\\"),
            '"' => out.push_str("\\\""),
            '.' | '^' | '$' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' => {
                out.push_str("\\\\");
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push('$');
    out
}

/// Render a predicate tree into a `$ ? (...)` template and its variable map.
pub fn render(predicate: &Predicate) -> (String, JsonMap) {
    let mut renderer = TemplateRenderer {
        vars: JsonMap::new(),
    };
    let body = renderer.predicate(predicate, true);
    (format!("$ ? ({})", body), renderer.vars)
}

struct TemplateRenderer {
    vars: JsonMap,
}

impl TemplateRenderer {
    fn next_var(&mut self, value: Value) -> String {
        let name = format!("v{}", self.vars.len());
        self.vars.insert(name.clone(), value);
        name
    }

    fn anchor(path: &str) -> String {
        if path.is_empty() {
            "@".to_string()
        } else if path.starts_with('[') {
            format!("@{}", path)
        } else {
            format!("@.{}", path)
        }
    }

    fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Compare { path, op, value } => {
                let var = self.next_var(value.clone());
                format!("{} {} ${}", Self::anchor(path), op.symbol(), var)
            }
            Condition::Null { path, is_null } => {
                let op = if *is_null { "==" } else { "!=" };
                format!("{} {} null", Self::anchor(path), op)
            }
            Condition::Regex {
                path,
                pattern,
                case_insensitive,
            } => {
                let flag = if *case_insensitive { " flag \"i\"" } else { "" };
                format!("{} like_regex \"{}\"{}", Self::anchor(path), pattern, flag)
            }
        }
    }

    fn join(&mut self, children: &[Predicate], connective: Connective) -> String {
        let separator = match connective {
            Connective::And => " && ",
            Connective::Or => " || ",
        };
        let parts: Vec<String> = children
            .iter()
            .map(|child| self.predicate(child, false))
            .collect();
        parts.join(separator)
    }

    fn predicate(&mut self, predicate: &Predicate, top_level: bool) -> String {
        match predicate {
            Predicate::Leaf(condition) => self.condition(condition),
            Predicate::Group {
                connective,
                children,
                negated,
            } => {
                if *negated {
                    // The bang's own parentheses make inner grouping
                    // redundant for a single child.
                    let inner = match children.as_slice() {
                        [only] => self.predicate(only, true),
                        many => self.join(many, *connective),
                    };
                    return format!("!({})", inner);
                }
                // Single-child groups collapse; the tree grows one group per
                // map level and most levels hold one entry.
                if let [only] = children.as_slice() {
                    return self.predicate(only, top_level);
                }
                let joined = self.join(children, *connective);
                // OR groups are parenthesized below the root so they never
                // rebind sibling && conditions.
                if *connective == Connective::Or && !top_level {
                    format!("({})", joined)
                } else {
                    joined
                }
            }
        }
    }
}
