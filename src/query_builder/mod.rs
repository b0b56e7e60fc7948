//! The relational query compiler.
//!
//! [`QueryCompiler`] turns resolved selection trees into parameterized SQL.
//! Relations attach as lateral correlated sub-queries whose shape follows the
//! relation's cardinality: one-to-one selects a single JSON object,
//! one-to-many a JSON array (coalesced to `[]`, never null), many-to-many the
//! same array built through the junction table so the parent only ever sees
//! the target entity. Aggregates and mutations are compiled in
//! [`aggregate_builder`] and [`mutation_builder`] against the same scope
//! machinery.
//!
//! A compiler instance is immutable after construction and safe to share
//! across threads; each compile call owns its own alias allocator.

use std::collections::HashSet;

use log::debug;

use crate::catalog::{Catalog, Entity, TableRef};
use crate::filter::FilterMap;
use crate::jsonpath::validate_path;
use crate::selection::{FieldKind, SelectionNode};
use crate::sql_ast::{
    render, Dialect, FromItem, Join, JoinKind, OrderByExpr, PostgresDialect, Query, SelectItem,
    SelectQuery, SqlExpr, Statement,
};
use crate::utils::to_snake_case;

mod aggregate_builder;
mod alias;
mod errors;
mod filter_builder;
mod mutation_builder;
mod operators;

pub use alias::{AliasAllocator, AliasMode};
pub use errors::{BuildError, BuildResult};
pub use operators::{OperatorFn, OperatorRegistry};

pub type CaseConverter = fn(&str) -> String;

/// Compiles selection trees into SQL against an immutable catalog.
pub struct QueryCompiler {
    catalog: Catalog,
    operators: OperatorRegistry,
    dialect: Box<dyn Dialect + Send + Sync>,
    case_converter: CaseConverter,
    default_limit: Option<u64>,
    alias_mode: AliasMode,
}

impl QueryCompiler {
    pub fn new(catalog: Catalog) -> Self {
        QueryCompiler {
            catalog,
            operators: OperatorRegistry::with_defaults(),
            dialect: Box::new(PostgresDialect),
            case_converter: to_snake_case,
            default_limit: Some(100),
            alias_mode: AliasMode::Deterministic,
        }
    }

    pub fn with_operators(mut self, operators: OperatorRegistry) -> Self {
        self.operators = operators;
        self
    }

    pub fn with_dialect<D: Dialect + Send + Sync + 'static>(mut self, dialect: D) -> Self {
        self.dialect = Box::new(dialect);
        self
    }

    pub fn with_case_converter(mut self, converter: CaseConverter) -> Self {
        self.case_converter = converter;
        self
    }

    /// Limit applied to root queries that carry no explicit `limit` argument.
    /// `None` disables the default.
    pub fn with_default_limit(mut self, limit: Option<u64>) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_alias_mode(mut self, mode: AliasMode) -> Self {
        self.alias_mode = mode;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Compile a read query for a selection tree root.
    pub fn compile_query(&self, node: &SelectionNode) -> BuildResult<Query> {
        let mut aliases = AliasAllocator::new(self.alias_mode);
        let entity = self.node_entity(node)?;
        let query = if node.kind == FieldKind::Aggregate {
            let scope = self.aggregate_scope(entity, node, &mut aliases)?;
            scope.select_row(true)
        } else {
            let mut scope =
                self.build_query(entity, entity.table.clone(), node, &mut aliases)?;
            if node.arguments.limit.is_none() {
                if let Some(limit) = self.default_limit {
                    scope.query.limit = Some(SqlExpr::Param(limit.into()));
                }
            }
            scope.select_row(true)
        };
        let compiled = render(&Statement::Select(query), self.dialect.as_ref());
        debug!("compiled query sql={} args={:?}", compiled.sql, compiled.args);
        Ok(compiled)
    }

    fn node_entity(&self, node: &SelectionNode) -> BuildResult<&Entity> {
        let name = node
            .entity
            .as_deref()
            .ok_or_else(|| BuildError::MissingEntity(node.name.clone()))?;
        Ok(self.catalog.entity(name)?)
    }

    /// Physical column for a field: catalog override first, otherwise the
    /// case-converted field name.
    pub(crate) fn column_for(&self, entity: &Entity, field: &str) -> String {
        entity
            .fields
            .get(field)
            .and_then(|def| def.column.clone())
            .unwrap_or_else(|| (self.case_converter)(field))
    }

    pub(crate) fn convert_case(&self, name: &str) -> String {
        (self.case_converter)(name)
    }

    /// Build the select scope for one selection node against a table.
    ///
    /// The table is passed separately from the entity so mutation payload
    /// queries can project an entity out of its CTE instead of its base table.
    pub(crate) fn build_query(
        &self,
        entity: &Entity,
        table: TableRef,
        node: &SelectionNode,
        aliases: &mut AliasAllocator,
    ) -> BuildResult<QueryScope> {
        debug!("building query entity={} table={}", entity.name, table.name);
        // An empty projection list is a syntax error in PostgreSQL.
        if node.children.is_empty() {
            return Err(BuildError::EmptySelection(node.name.clone()));
        }
        let alias = aliases.next();
        let mut scope = QueryScope {
            query: SelectQuery {
                from: Some(FromItem::Table {
                    table,
                    alias: Some(alias.clone()),
                }),
                ..SelectQuery::default()
            },
            alias,
            selects: Vec::new(),
        };

        let mut added: HashSet<&str> = HashSet::new();
        for child in &node.children {
            if !added.insert(child.output_name()) {
                continue;
            }
            match child.kind {
                FieldKind::Scalar => scope.selects.push(ProjectedColumn {
                    table: scope.alias.clone(),
                    column: self.column_for(entity, &child.name),
                    output: child.output_name().to_string(),
                    expr: None,
                }),
                FieldKind::Json | FieldKind::Object => {
                    let base = SqlExpr::column(&scope.alias, self.column_for(entity, &child.name));
                    let expr = if child.children.is_empty() {
                        None
                    } else {
                        Some(self.json_field_object(base, &child.children)?)
                    };
                    scope.selects.push(ProjectedColumn {
                        table: scope.alias.clone(),
                        column: self.column_for(entity, &child.name),
                        output: child.output_name().to_string(),
                        expr,
                    });
                }
                FieldKind::Relation => self.build_relation(entity, &mut scope, child, aliases)?,
                FieldKind::Aggregate => {
                    self.build_relation_aggregate(entity, &mut scope, child, aliases)?
                }
            }
        }

        self.apply_pagination(&mut scope.query, node);
        self.apply_ordering(&mut scope.query, &scope.alias, node);
        if let Some(filter) = &node.arguments.filter {
            let parsed = FilterMap::parse(filter, &self.operators.vocabulary())?;
            let alias = scope.alias.clone();
            let expr = self.build_filter(&alias, entity, &parsed, aliases)?;
            scope.query.and_where(expr);
        }
        Ok(scope)
    }

    fn apply_pagination(&self, query: &mut SelectQuery, node: &SelectionNode) {
        if let Some(limit) = node.arguments.limit {
            query.limit = Some(SqlExpr::Param(limit.into()));
        }
        if let Some(offset) = node.arguments.offset {
            query.offset = Some(SqlExpr::Param(offset.into()));
        }
    }

    fn apply_ordering(&self, query: &mut SelectQuery, alias: &str, node: &SelectionNode) {
        for order in &node.arguments.order_by {
            query.order_by.push(OrderByExpr {
                expr: SqlExpr::column(alias, self.convert_case(&order.key)),
                direction: order.direction,
            });
        }
    }

    /// Project requested sub-fields of a JSON column as a JSON object,
    /// descending through nested objects.
    fn json_field_object(
        &self,
        base: SqlExpr,
        children: &[SelectionNode],
    ) -> BuildResult<SqlExpr> {
        let mut pairs = Vec::with_capacity(children.len());
        for child in children {
            validate_path(&child.name)?;
            let value = SqlExpr::JsonGet {
                base: Box::new(base.clone()),
                key: child.name.clone(),
            };
            let value = match child.kind {
                FieldKind::Scalar => value,
                FieldKind::Object | FieldKind::Json => {
                    if child.children.is_empty() {
                        value
                    } else {
                        self.json_field_object(value, &child.children)?
                    }
                }
                _ => return Err(BuildError::UnsupportedFieldKind(child.name.clone())),
            };
            pairs.push((child.output_name().to_string(), value));
        }
        Ok(SqlExpr::JsonBuildObject(pairs))
    }

    fn build_relation(
        &self,
        parent_entity: &Entity,
        parent: &mut QueryScope,
        node: &SelectionNode,
        aliases: &mut AliasAllocator,
    ) -> BuildResult<()> {
        use crate::catalog::Cardinality;

        let rel = parent_entity.relation(&node.name)?.clone();
        let target = self.catalog.entity(&rel.target)?;
        debug!("building relation field={} target={}", node.name, target.name);
        let rel_scope = self.build_query(target, target.table.clone(), node, aliases)?;
        let rel_alias = rel_scope.alias.clone();
        let output = node.output_name().to_string();

        match rel.cardinality {
            Cardinality::OneToOne | Cardinality::OneToMany => {
                let mut sub = if rel.cardinality == Cardinality::OneToOne {
                    rel_scope.select_json(&output)
                } else {
                    rel_scope.select_json_agg(&output)
                };
                sub.and_where(cross_condition(
                    &parent.alias,
                    &rel.local_keys,
                    &rel_alias,
                    &rel.referenced_keys,
                ));
                parent.query.joins.push(Join {
                    kind: JoinKind::Left,
                    from: FromItem::Subquery {
                        query: Box::new(sub),
                        alias: rel_alias.clone(),
                        lateral: true,
                    },
                    on: None,
                });
                parent.selects.push(ProjectedColumn {
                    table: rel_alias,
                    column: output.clone(),
                    output,
                    expr: None,
                });
            }
            Cardinality::ManyToMany => {
                let junction = rel.junction.as_ref().ok_or_else(|| {
                    crate::catalog::CatalogError::MissingJunction(node.name.clone())
                })?;
                let m2m_alias = aliases.next();
                let outputs: Vec<String> =
                    rel_scope.selects.iter().map(|c| c.output.clone()).collect();

                // Row query over the target, correlated to the junction.
                let mut row = rel_scope.select_row(true);
                row.and_where(cross_condition(
                    &m2m_alias,
                    &junction.referenced_keys,
                    &rel_alias,
                    &rel.referenced_keys,
                ));

                // Aggregate through the junction, correlated to the parent.
                let mut agg = SelectQuery {
                    from: Some(FromItem::Table {
                        table: TableRef {
                            name: junction.table.clone(),
                            schema: target.table.schema.clone(),
                        },
                        alias: Some(m2m_alias.clone()),
                    }),
                    ..SelectQuery::default()
                };
                agg.joins.push(Join {
                    kind: JoinKind::Inner,
                    from: FromItem::Subquery {
                        query: Box::new(row),
                        alias: rel_alias.clone(),
                        lateral: true,
                    },
                    on: None,
                });
                agg.and_where(cross_condition(
                    &parent.alias,
                    &rel.local_keys,
                    &m2m_alias,
                    &junction.local_keys,
                ));
                let object = SqlExpr::JsonBuildObject(
                    outputs
                        .into_iter()
                        .map(|name| (name.clone(), SqlExpr::column(&rel_alias, name)))
                        .collect(),
                );
                agg.projection = vec![SelectItem {
                    expr: SqlExpr::CoalesceEmptyArray(Box::new(SqlExpr::JsonAgg(Box::new(
                        object,
                    )))),
                    alias: Some(output.clone()),
                }];

                let agg_alias = aliases.next();
                parent.query.joins.push(Join {
                    kind: JoinKind::Cross,
                    from: FromItem::Subquery {
                        query: Box::new(agg),
                        alias: agg_alias.clone(),
                        lateral: true,
                    },
                    on: None,
                });
                parent.selects.push(ProjectedColumn {
                    table: agg_alias,
                    column: output.clone(),
                    output,
                    expr: None,
                });
            }
        }
        Ok(())
    }
}

/// Pairwise equality between two alias/key lists, ANDed together.
pub(crate) fn cross_condition(
    left_alias: &str,
    left_keys: &[String],
    right_alias: &str,
    right_keys: &[String],
) -> SqlExpr {
    SqlExpr::And(
        left_keys
            .iter()
            .zip(right_keys)
            .map(|(l, r)| SqlExpr::columns_eq(left_alias, l, right_alias, r))
            .collect(),
    )
}

/// One projected output of a scope: a plain column or a computed expression.
#[derive(Debug, Clone)]
pub(crate) struct ProjectedColumn {
    pub table: String,
    pub column: String,
    pub output: String,
    pub expr: Option<SqlExpr>,
}

impl ProjectedColumn {
    fn expression(&self) -> SqlExpr {
        match &self.expr {
            Some(expr) => expr.clone(),
            None => SqlExpr::column(&self.table, &self.column),
        }
    }
}

/// A select query under construction together with its projection list.
///
/// The projection stays symbolic until one of the `select_*` finishers runs,
/// because relations need the same column set both as a row projection and as
/// JSON object construction arguments.
#[derive(Debug)]
pub(crate) struct QueryScope {
    pub query: SelectQuery,
    pub alias: String,
    pub selects: Vec<ProjectedColumn>,
}

impl QueryScope {
    /// Finish as a plain row query. `aliased` controls whether columns are
    /// exposed under their output names or their physical names.
    pub fn select_row(mut self, aliased: bool) -> SelectQuery {
        self.query.projection = self
            .selects
            .iter()
            .map(|c| SelectItem {
                expr: c.expression(),
                alias: Some(if aliased {
                    c.output.clone()
                } else {
                    c.column.clone()
                }),
            })
            .collect();
        self.query
    }

    /// JSON object of every projected column keyed by output name.
    pub fn json_object(&self) -> SqlExpr {
        SqlExpr::JsonBuildObject(
            self.selects
                .iter()
                .map(|c| (c.output.clone(), c.expression()))
                .collect(),
        )
    }

    /// Finish as a single JSON object per row.
    pub fn select_json(mut self, alias: &str) -> SelectQuery {
        let object = self.json_object();
        self.query.projection = vec![SelectItem {
            expr: object,
            alias: Some(alias.to_string()),
        }];
        self.query
    }

    /// Finish as one JSON array of row objects, empty array when no rows.
    pub fn select_json_agg(mut self, alias: &str) -> SelectQuery {
        let object = self.json_object();
        self.query.projection = vec![SelectItem {
            expr: SqlExpr::CoalesceEmptyArray(Box::new(SqlExpr::JsonAgg(Box::new(object)))),
            alias: Some(alias.to_string()),
        }];
        self.query
    }
}
