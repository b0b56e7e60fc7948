//! Filter maps into boolean SQL expressions.
//!
//! Sibling conditions AND together; `AND`/`OR`/`NOT` entries group
//! explicitly. Field entries dispatch on the catalog field kind: relations
//! become correlated `EXISTS` sub-queries (never joins, to avoid row
//! multiplication), JSON columns delegate to the path compiler, everything
//! else resolves through the operator registry.

use log::debug;

use crate::catalog::{Cardinality, CatalogError, Entity, FieldType, RelationDescriptor, TableRef};
use crate::filter::{FieldFilter, FilterMap, FilterNode, OperatorEntry};
use crate::jsonpath;
use crate::sql_ast::{FromItem, Join, JoinKind, SelectQuery, SqlExpr};

use super::errors::{BuildError, BuildResult};
use super::{cross_condition, AliasAllocator, QueryCompiler};

impl QueryCompiler {
    pub(crate) fn build_filter(
        &self,
        alias: &str,
        entity: &Entity,
        map: &FilterMap,
        aliases: &mut AliasAllocator,
    ) -> BuildResult<SqlExpr> {
        let mut parts = Vec::with_capacity(map.entries.len());
        for entry in &map.entries {
            let expr = match entry {
                FilterNode::And(maps) => SqlExpr::And(
                    maps.iter()
                        .map(|m| self.build_filter(alias, entity, m, aliases))
                        .collect::<BuildResult<_>>()?,
                ),
                FilterNode::Or(maps) => SqlExpr::Or(
                    maps.iter()
                        .map(|m| self.build_filter(alias, entity, m, aliases))
                        .collect::<BuildResult<_>>()?,
                ),
                FilterNode::Not(inner) => SqlExpr::Not(Box::new(
                    self.build_filter(alias, entity, inner, aliases)?,
                )),
                FilterNode::Field { name, filter } => {
                    self.build_field_filter(alias, entity, name, filter, aliases)?
                }
            };
            parts.push(expr);
        }
        Ok(SqlExpr::And(parts))
    }

    fn build_field_filter(
        &self,
        alias: &str,
        entity: &Entity,
        field: &str,
        filter: &FieldFilter,
        aliases: &mut AliasAllocator,
    ) -> BuildResult<SqlExpr> {
        match entity.fields.get(field).map(|def| &def.field_type) {
            Some(FieldType::Relation(rel)) => {
                let FieldFilter::Nested(map) = filter else {
                    return Err(BuildError::InvalidFilterShape(format!(
                        "relation '{}' takes a nested filter map, not operators",
                        field
                    )));
                };
                debug!("building relation filter field={}", field);
                let rel = rel.clone();
                self.build_relation_filter(alias, &rel, field, map, aliases)
            }
            Some(FieldType::Json) => {
                let column = SqlExpr::column(alias, self.column_for(entity, field));
                self.build_json_filter(column, filter)
            }
            _ => self.build_operator_filter(alias, entity, field, filter),
        }
    }

    /// JSON columns compile through the path template compiler, except a lone
    /// `isNull`, which tests the column itself.
    fn build_json_filter(&self, column: SqlExpr, filter: &FieldFilter) -> BuildResult<SqlExpr> {
        if let FieldFilter::Operators(entries) = filter {
            if let [OperatorEntry::Op { name, value }] = entries.as_slice() {
                if name == "isNull" {
                    let is_null = value.as_bool().ok_or_else(|| {
                        BuildError::InvalidFilterShape(
                            "isNull requires a boolean value".to_string(),
                        )
                    })?;
                    return Ok(SqlExpr::IsNull {
                        expr: Box::new(column),
                        negated: !is_null,
                    });
                }
            }
        }
        let compiled = match filter {
            FieldFilter::Nested(map) => jsonpath::compile(map)?,
            FieldFilter::Operators(_) => jsonpath::compile_field_filter(filter)?,
        };
        Ok(SqlExpr::JsonPathExists {
            column: Box::new(column),
            template: compiled.template,
            vars: compiled.vars,
        })
    }

    fn build_operator_filter(
        &self,
        alias: &str,
        entity: &Entity,
        field: &str,
        filter: &FieldFilter,
    ) -> BuildResult<SqlExpr> {
        let FieldFilter::Operators(entries) = filter else {
            return Err(BuildError::InvalidFilterShape(format!(
                "field '{}' is not filterable by a nested map",
                field
            )));
        };
        let column = self.column_for(entity, field);
        let mut parts = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                OperatorEntry::Op { name, value } => {
                    let op = self
                        .operators
                        .get(name)
                        .ok_or_else(|| BuildError::UnknownOperator(name.clone()))?;
                    parts.push(op(alias, &column, value)?);
                }
                OperatorEntry::Any(_) | OperatorEntry::All(_) => {
                    return Err(BuildError::InvalidFilterShape(format!(
                        "array quantifiers only apply to JSON fields, not '{}'",
                        field
                    )));
                }
            }
        }
        Ok(SqlExpr::And(parts))
    }

    /// `EXISTS (SELECT 1 FROM target ...)` correlated on the relation keys,
    /// with the nested map as the sub-query's own filter.
    fn build_relation_filter(
        &self,
        parent_alias: &str,
        rel: &RelationDescriptor,
        field: &str,
        map: &FilterMap,
        aliases: &mut AliasAllocator,
    ) -> BuildResult<SqlExpr> {
        let target = self.catalog.entity(&rel.target)?;
        let target_alias = aliases.next();
        let mut sub = SelectQuery {
            from: Some(FromItem::Table {
                table: target.table.clone(),
                alias: Some(target_alias.clone()),
            }),
            ..SelectQuery::default()
        };

        match rel.cardinality {
            Cardinality::OneToOne | Cardinality::OneToMany => {
                sub.and_where(cross_condition(
                    parent_alias,
                    &rel.local_keys,
                    &target_alias,
                    &rel.referenced_keys,
                ));
            }
            Cardinality::ManyToMany => {
                let junction = rel
                    .junction
                    .as_ref()
                    .ok_or_else(|| CatalogError::MissingJunction(field.to_string()))?;
                let junction_alias = aliases.next();
                let on = SqlExpr::And(vec![
                    cross_condition(
                        parent_alias,
                        &rel.local_keys,
                        &junction_alias,
                        &junction.local_keys,
                    ),
                    cross_condition(
                        &junction_alias,
                        &junction.referenced_keys,
                        &target_alias,
                        &rel.referenced_keys,
                    ),
                ]);
                sub.joins.push(Join {
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
            }
        }

        let inner = self.build_filter(&target_alias, target, map, aliases)?;
        sub.and_where(inner);
        sub.projection = vec![crate::sql_ast::SelectItem {
            expr: SqlExpr::Raw("1"),
            alias: None,
        }];
        Ok(SqlExpr::Exists(Box::new(sub)))
    }
}
