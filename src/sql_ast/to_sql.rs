//! The single SQL printer.
//!
//! Rendering walks the statement tree exactly once, emitting text and
//! collecting bound arguments in the same pass, so placeholder numbers always
//! match argument positions. No other module produces SQL text.

use serde_json::Value;

use crate::selection::OrderDirection;
use crate::utils::escape_single_quotes;

use super::dialect::{write_table, Dialect};
use super::{
    BinaryOp, Cte, DeleteStatement, FromItem, InsertStatement, Join, JoinKind, OrderByExpr, Query,
    SelectItem, SelectQuery, SqlExpr, Statement, UpdateStatement,
};

/// Render a statement against a dialect.
pub fn render(statement: &Statement, dialect: &dyn Dialect) -> Query {
    let mut renderer = Renderer {
        dialect,
        sql: String::new(),
        args: Vec::new(),
    };
    renderer.statement(statement);
    Query {
        sql: renderer.sql,
        args: renderer.args,
    }
}

struct Renderer<'a> {
    dialect: &'a dyn Dialect,
    sql: String,
    args: Vec<Value>,
}

impl Renderer<'_> {
    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn bind(&mut self, value: Value) {
        self.args.push(value);
        let placeholder = self.dialect.placeholder(self.args.len());
        self.push(&placeholder);
    }

    fn ident(&mut self, name: &str) {
        let quoted = self.dialect.quote_ident(name);
        self.push(&quoted);
    }

    fn string_lit(&mut self, s: &str) {
        self.push("'");
        self.push(&escape_single_quotes(s));
        self.push("'");
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Select(query) => self.select(query),
            Statement::Insert(insert) => self.insert(insert),
            Statement::Update(update) => self.update(update),
            Statement::Delete(delete) => self.delete(delete),
        }
    }

    fn ctes(&mut self, ctes: &[Cte]) {
        if ctes.is_empty() {
            return;
        }
        self.push("WITH ");
        for (i, cte) in ctes.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(&cte.name);
            self.push(" AS (");
            self.statement(&cte.statement);
            self.push(")");
        }
        self.push(" ");
    }

    fn select(&mut self, query: &SelectQuery) {
        self.ctes(&query.with);
        self.push("SELECT ");
        for (i, item) in query.projection.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.select_item(item);
        }
        if let Some(from) = &query.from {
            self.push(" FROM ");
            self.from_item(from);
        }
        for join in &query.joins {
            self.join(join);
        }
        if let Some(where_clause) = &query.where_clause {
            self.push(" WHERE ");
            self.expr(where_clause);
        }
        if !query.group_by.is_empty() {
            self.push(" GROUP BY ");
            for (i, expr) in query.group_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.expr(expr);
            }
        }
        if !query.order_by.is_empty() {
            self.push(" ORDER BY ");
            for (i, order) in query.order_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.order_by(order);
            }
        }
        if let Some(limit) = &query.limit {
            self.push(" LIMIT ");
            self.expr(limit);
        }
        if let Some(offset) = &query.offset {
            self.push(" OFFSET ");
            self.expr(offset);
        }
    }

    fn select_item(&mut self, item: &SelectItem) {
        self.expr(&item.expr);
        if let Some(alias) = &item.alias {
            self.push(" AS ");
            self.ident(alias);
        }
    }

    fn from_item(&mut self, from: &FromItem) {
        match from {
            FromItem::Table { table, alias } => {
                write_table(&mut self.sql, self.dialect, table);
                if let Some(alias) = alias {
                    self.push(" AS ");
                    self.ident(alias);
                }
            }
            FromItem::Subquery {
                query,
                alias,
                lateral,
            } => {
                if *lateral {
                    self.push("LATERAL ");
                }
                self.push("(");
                self.select(query);
                self.push(") AS ");
                self.ident(alias);
            }
        }
    }

    fn join(&mut self, join: &Join) {
        match join.kind {
            JoinKind::Inner => self.push(" INNER JOIN "),
            JoinKind::Left => self.push(" LEFT JOIN "),
            JoinKind::Cross => self.push(" CROSS JOIN "),
        }
        self.from_item(&join.from);
        if join.kind != JoinKind::Cross {
            self.push(" ON ");
            match &join.on {
                Some(on) => self.expr(on),
                None => self.push("true"),
            }
        }
    }

    fn order_by(&mut self, order: &OrderByExpr) {
        self.expr(&order.expr);
        match order.direction {
            OrderDirection::Asc => self.push(" ASC"),
            OrderDirection::Desc => self.push(" DESC"),
            OrderDirection::AscNullsFirst => self.push(" ASC NULLS FIRST"),
            OrderDirection::DescNullsFirst => self.push(" DESC NULLS FIRST"),
        }
    }

    fn insert(&mut self, insert: &InsertStatement) {
        self.push("INSERT INTO ");
        write_table(&mut self.sql, self.dialect, &insert.table);
        if let Some(alias) = &insert.alias {
            self.push(" AS ");
            self.ident(alias);
        }
        self.push(" (");
        for (i, column) in insert.columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(column);
        }
        self.push(") VALUES ");
        for (i, row) in insert.rows.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push("(");
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    self.push(", ");
                }
                self.expr(value);
            }
            self.push(")");
        }
        if insert.returning_all {
            self.push(" RETURNING *");
        }
    }

    fn update(&mut self, update: &UpdateStatement) {
        self.push("UPDATE ");
        write_table(&mut self.sql, self.dialect, &update.table);
        if let Some(alias) = &update.alias {
            self.push(" AS ");
            self.ident(alias);
        }
        self.push(" SET ");
        for (i, (column, value)) in update.assignments.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(column);
            self.push(" = ");
            self.expr(value);
        }
        if let Some(where_clause) = &update.where_clause {
            self.push(" WHERE ");
            self.expr(where_clause);
        }
        if update.returning_all {
            self.push(" RETURNING *");
        }
    }

    fn delete(&mut self, delete: &DeleteStatement) {
        self.push("DELETE FROM ");
        write_table(&mut self.sql, self.dialect, &delete.table);
        if let Some(where_clause) = &delete.where_clause {
            self.push(" WHERE ");
            self.expr(where_clause);
        }
        if delete.returning_all {
            self.push(" RETURNING *");
        }
    }

    fn binary_op(&mut self, op: BinaryOp) {
        self.push(match op {
            BinaryOp::Eq => " = ",
            BinaryOp::Neq => " != ",
            BinaryOp::Gt => " > ",
            BinaryOp::Gte => " >= ",
            BinaryOp::Lt => " < ",
            BinaryOp::Lte => " <= ",
            BinaryOp::Like => " LIKE ",
            BinaryOp::ILike => " ILIKE ",
        });
    }

    fn expr(&mut self, expr: &SqlExpr) {
        match expr {
            SqlExpr::Column { table, column } => {
                self.ident(table);
                self.push(".");
                self.ident(column);
            }
            SqlExpr::Param(value) => self.bind(value.clone()),
            SqlExpr::StringLit(s) => self.string_lit(s),
            SqlExpr::Raw(s) => self.push(s),
            SqlExpr::FuncCall { name, args } => {
                self.push(name);
                self.push("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(arg);
                }
                self.push(")");
            }
            SqlExpr::Binary { left, op, right } => {
                self.expr(left);
                self.binary_op(*op);
                self.expr(right);
            }
            SqlExpr::And(children) => self.connective(children, " AND "),
            SqlExpr::Or(children) => self.connective(children, " OR "),
            SqlExpr::Not(inner) => {
                self.push("NOT (");
                self.expr(inner);
                self.push(")");
            }
            SqlExpr::IsNull { expr, negated } => {
                self.expr(expr);
                self.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                self.expr(expr);
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(item);
                }
                self.push(")");
            }
            SqlExpr::Exists(query) => {
                self.push("EXISTS (");
                self.select(query);
                self.push(")");
            }
            SqlExpr::Subquery(query) => {
                self.push("(");
                self.select(query);
                self.push(")");
            }
            SqlExpr::JsonGet { base, key } => {
                self.expr(base);
                self.push(" ");
                self.push(self.dialect.json_get_op());
                self.push(" ");
                self.string_lit(key);
            }
            SqlExpr::JsonBuildObject(pairs) => {
                self.push(self.dialect.json_build_object_fn());
                self.push("(");
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.string_lit(key);
                    self.push(", ");
                    self.expr(value);
                }
                self.push(")");
            }
            SqlExpr::JsonAgg(inner) => {
                self.push(self.dialect.json_agg_fn());
                self.push("(");
                self.expr(inner);
                self.push(")");
            }
            SqlExpr::CoalesceEmptyArray(inner) => {
                self.push("coalesce(");
                self.expr(inner);
                self.push(", ");
                self.push(self.dialect.empty_json_array());
                self.push(")");
            }
            SqlExpr::JsonPathExists {
                column,
                template,
                vars,
            } => {
                self.push(self.dialect.json_path_exists_fn());
                self.push("(");
                self.expr(column);
                self.push(", ");
                self.bind(Value::String(template.clone()));
                self.push(self.dialect.json_path_cast());
                if !vars.is_empty() {
                    self.push(", ");
                    self.bind(Value::Object(vars.clone()));
                    self.push(self.dialect.json_vars_cast());
                }
                self.push(")");
            }
        }
    }

    /// AND/OR chains collapse a single child and parenthesize otherwise.
    fn connective(&mut self, children: &[SqlExpr], separator: &str) {
        match children {
            [] => self.push("true"),
            [only] => self.expr(only),
            many => {
                self.push("(");
                for (i, child) in many.iter().enumerate() {
                    if i > 0 {
                        self.push(separator);
                    }
                    self.expr(child);
                }
                self.push(")");
            }
        }
    }
}
