//! Tagged SQL expression tree.
//!
//! The compiler never concatenates SQL fragments while it builds a query;
//! it assembles this AST and hands it to the single renderer in [`to_sql`].
//! Values only ever appear as [`SqlExpr::Param`] nodes, which the renderer
//! turns into positional placeholders, so injection safety and alias
//! uniqueness are structural properties rather than string discipline.

use serde_json::Value;

use crate::catalog::TableRef;
use crate::selection::{JsonMap, OrderDirection};

pub mod dialect;
pub mod to_sql;

pub use dialect::{Dialect, PostgresDialect};
pub use to_sql::render;

/// The compiler's output: dialect-specific SQL text with positional
/// placeholders and the matching ordered argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// `"table"."column"`
    Column { table: String, column: String },
    /// A bound value, rendered as the next positional placeholder.
    Param(Value),
    /// A single-quoted string literal. Only validated identifiers (JSON
    /// object keys) go through here, never user values.
    StringLit(String),
    /// A trusted SQL fragment (`1`, `true`). Internal constants only.
    Raw(&'static str),
    FuncCall {
        name: &'static str,
        args: Vec<SqlExpr>,
    },
    Binary {
        left: Box<SqlExpr>,
        op: BinaryOp,
        right: Box<SqlExpr>,
    },
    And(Vec<SqlExpr>),
    Or(Vec<SqlExpr>),
    Not(Box<SqlExpr>),
    IsNull {
        expr: Box<SqlExpr>,
        negated: bool,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
        negated: bool,
    },
    Exists(Box<SelectQuery>),
    /// Scalar sub-query, parenthesized.
    Subquery(Box<SelectQuery>),
    /// Native JSON "get" operator: `base -> 'key'`.
    JsonGet {
        base: Box<SqlExpr>,
        key: String,
    },
    /// JSON object construction from key/expression pairs.
    JsonBuildObject(Vec<(String, SqlExpr)>),
    /// JSON array aggregation of one expression.
    JsonAgg(Box<SqlExpr>),
    /// `coalesce(expr, '[]'::jsonb)`, so relation arrays are never null.
    CoalesceEmptyArray(Box<SqlExpr>),
    /// Dialect "path exists" predicate over a JSON column. Both the path
    /// template and the variable map are bound as parameters.
    JsonPathExists {
        column: Box<SqlExpr>,
        template: String,
        vars: JsonMap,
    },
}

impl SqlExpr {
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        SqlExpr::Column {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn binary(left: SqlExpr, op: BinaryOp, right: SqlExpr) -> Self {
        SqlExpr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Equality between two columns, the building block of join conditions.
    pub fn columns_eq(
        left_table: &str,
        left_column: &str,
        right_table: &str,
        right_column: &str,
    ) -> Self {
        SqlExpr::binary(
            SqlExpr::column(left_table, left_column),
            BinaryOp::Eq,
            SqlExpr::column(right_table, right_column),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table {
        table: TableRef,
        alias: Option<String>,
    },
    Subquery {
        query: Box<SelectQuery>,
        alias: String,
        lateral: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub from: FromItem,
    /// `None` renders `ON true` for inner/left joins; cross joins carry no
    /// condition.
    pub on: Option<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: SqlExpr,
    pub direction: OrderDirection,
}

/// A named common table expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub statement: Box<Statement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub with: Vec<Cte>,
    pub projection: Vec<SelectItem>,
    pub from: Option<FromItem>,
    pub joins: Vec<Join>,
    pub where_clause: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<SqlExpr>,
    pub offset: Option<SqlExpr>,
}

impl SelectQuery {
    /// AND an expression onto the WHERE clause.
    pub fn and_where(&mut self, expr: SqlExpr) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => SqlExpr::And(vec![existing, expr]),
            None => expr,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: TableRef,
    pub alias: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlExpr>>,
    pub returning_all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: TableRef,
    pub alias: Option<String>,
    pub assignments: Vec<(String, SqlExpr)>,
    pub where_clause: Option<SqlExpr>,
    pub returning_all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: TableRef,
    pub where_clause: Option<SqlExpr>,
    pub returning_all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectQuery),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}
