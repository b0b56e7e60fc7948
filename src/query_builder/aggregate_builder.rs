//! Aggregate selections.
//!
//! An aggregate node selects from `count`, `group`, and the reducer family
//! (`sum`, `avg`, `min`, `max`); reducers take the requested sub-fields and
//! produce one JSON object per reducer keyed by field name. Relation
//! aggregates reuse the same scope and attach laterally to the parent, with
//! the many-to-many case joining through the junction before aggregating.

use log::debug;

use crate::catalog::{Cardinality, CatalogError, Entity, TableRef};
use crate::filter::FilterMap;
use crate::selection::SelectionNode;
use crate::sql_ast::{FromItem, Join, JoinKind, SelectItem, SelectQuery, SqlExpr};

use super::errors::{BuildError, BuildResult};
use super::{cross_condition, AliasAllocator, ProjectedColumn, QueryCompiler, QueryScope};

impl QueryCompiler {
    pub(crate) fn aggregate_scope(
        &self,
        entity: &Entity,
        node: &SelectionNode,
        aliases: &mut AliasAllocator,
    ) -> BuildResult<QueryScope> {
        debug!("building aggregate entity={}", entity.name);
        let alias = aliases.next();
        let mut scope = QueryScope {
            query: SelectQuery {
                from: Some(FromItem::Table {
                    table: entity.table.clone(),
                    alias: Some(alias.clone()),
                }),
                ..SelectQuery::default()
            },
            alias,
            selects: Vec::new(),
        };

        for child in &node.children {
            let expr = match child.name.as_str() {
                "count" => SqlExpr::FuncCall {
                    name: "count",
                    args: vec![SqlExpr::Raw("1")],
                },
                "group" => {
                    if node.arguments.group_by.is_empty() {
                        continue;
                    }
                    let mut pairs = Vec::with_capacity(node.arguments.group_by.len());
                    for key in &node.arguments.group_by {
                        let column = self.column_for(entity, key);
                        scope
                            .query
                            .group_by
                            .push(SqlExpr::column(&scope.alias, &column));
                        pairs.push((column.clone(), SqlExpr::column(&scope.alias, column)));
                    }
                    json_build_object(pairs)
                }
                name => {
                    let func: &'static str = match name {
                        "sum" => "sum",
                        "avg" => "avg",
                        "min" => "min",
                        "max" => "max",
                        other => return Err(BuildError::UnknownAggregate(other.to_string())),
                    };
                    let pairs = child
                        .children
                        .iter()
                        .map(|f| {
                            (
                                f.output_name().to_string(),
                                SqlExpr::FuncCall {
                                    name: func,
                                    args: vec![SqlExpr::column(
                                        &scope.alias,
                                        self.column_for(entity, &f.name),
                                    )],
                                },
                            )
                        })
                        .collect();
                    json_build_object(pairs)
                }
            };
            scope.selects.push(ProjectedColumn {
                table: scope.alias.clone(),
                column: child.name.clone(),
                output: child.output_name().to_string(),
                expr: Some(expr),
            });
        }

        // Guards both an empty child list and a `group` skipped for lack of
        // group keys; either way there is nothing to project.
        if scope.selects.is_empty() {
            return Err(BuildError::EmptySelection(node.name.clone()));
        }

        if let Some(filter) = &node.arguments.filter {
            let parsed = FilterMap::parse(filter, &self.operators.vocabulary())?;
            let alias = scope.alias.clone();
            let expr = self.build_filter(&alias, entity, &parsed, aliases)?;
            scope.query.and_where(expr);
        }
        Ok(scope)
    }

    /// Attach a `_<relation>Aggregate` selection to its parent scope.
    pub(crate) fn build_relation_aggregate(
        &self,
        parent_entity: &Entity,
        parent: &mut QueryScope,
        node: &SelectionNode,
        aliases: &mut AliasAllocator,
    ) -> BuildResult<()> {
        let relation_field = node
            .aggregate_relation_field()
            .ok_or_else(|| BuildError::UnsupportedFieldKind(node.name.clone()))?;
        let rel = parent_entity.relation(relation_field)?.clone();
        let target = self.catalog.entity(&rel.target)?;
        let mut agg_scope = self.aggregate_scope(target, node, aliases)?;
        let agg_alias = agg_scope.alias.clone();
        let output = node.output_name().to_string();

        let (join_kind, correlated) = match rel.cardinality {
            Cardinality::OneToOne | Cardinality::OneToMany => (JoinKind::Left, true),
            Cardinality::ManyToMany => {
                let junction = rel.junction.as_ref().ok_or_else(|| {
                    CatalogError::MissingJunction(relation_field.to_string())
                })?;
                let junction_alias = aliases.next();
                let on = SqlExpr::And(vec![
                    cross_condition(
                        &parent.alias,
                        &rel.local_keys,
                        &junction_alias,
                        &junction.local_keys,
                    ),
                    cross_condition(
                        &junction_alias,
                        &junction.referenced_keys,
                        &agg_alias,
                        &rel.referenced_keys,
                    ),
                ]);
                agg_scope.query.joins.push(Join {
                    kind: JoinKind::Inner,
                    from: FromItem::Table {
                        table: TableRef {
                            name: junction.table.clone(),
                            schema: target.table.schema.clone(),
                        },
                        alias: Some(junction_alias),
                    },
                    on: Some(on),
                });
                (JoinKind::Cross, false)
            }
        };

        let mut json = agg_scope.select_json(&output);
        if correlated {
            json.and_where(cross_condition(
                &parent.alias,
                &rel.local_keys,
                &agg_alias,
                &rel.referenced_keys,
            ));
        }

        // Aggregate the single-row object so a missing relation yields an
        // empty array instead of dropping the parent row.
        let outer_alias = aliases.next();
        let outer = SelectQuery {
            projection: vec![SelectItem {
                expr: SqlExpr::CoalesceEmptyArray(Box::new(SqlExpr::JsonAgg(Box::new(
                    SqlExpr::column(&agg_alias, &output),
                )))),
                alias: Some(output.clone()),
            }],
            from: Some(FromItem::Subquery {
                query: Box::new(json),
                alias: agg_alias,
                lateral: false,
            }),
            ..SelectQuery::default()
        };
        parent.query.joins.push(Join {
            kind: join_kind,
            from: FromItem::Subquery {
                query: Box::new(outer),
                alias: outer_alias.clone(),
                lateral: true,
            },
            on: None,
        });
        parent.selects.push(ProjectedColumn {
            table: outer_alias,
            column: output.clone(),
            output,
            expr: None,
        });
        Ok(())
    }
}

fn json_build_object(pairs: Vec<(String, SqlExpr)>) -> SqlExpr {
    let mut args = Vec::with_capacity(pairs.len() * 2);
    for (key, value) in pairs {
        args.push(SqlExpr::StringLit(key));
        args.push(value);
    }
    SqlExpr::FuncCall {
        name: "json_build_object",
        args,
    }
}
