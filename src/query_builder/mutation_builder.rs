//! Mutation compilation.
//!
//! Every mutation wraps its statement in a named CTE with `RETURNING *`, then
//! selects the payload from the CTE: the caller's projection of the mutated
//! rows (compiled by the regular query builder against the CTE as a virtual
//! table) plus `rows_affected` as a count over the CTE.

use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use crate::catalog::{Entity, TableRef};
use crate::filter::FilterMap;
use crate::selection::{JsonMap, SelectionNode};
use crate::sql_ast::{
    render, Cte, DeleteStatement, FromItem, InsertStatement, Query, SelectItem, SelectQuery,
    SqlExpr, Statement, UpdateStatement,
};

use super::errors::{BuildError, BuildResult};
use super::{AliasAllocator, QueryCompiler};

impl QueryCompiler {
    /// Compile an insert of one or many records.
    pub fn compile_create(&self, node: &SelectionNode) -> BuildResult<Query> {
        let aliases = AliasAllocator::new(self.alias_mode);
        let entity = self.mutation_entity(node)?;
        let records = self.input_records(node)?;
        debug!("building insert entity={} records={}", entity.name, records.len());

        // Union of columns across records, sorted for stable output; absent
        // columns insert NULL.
        let rows: Vec<BTreeMap<String, &Value>> = records
            .iter()
            .map(|record| {
                record
                    .iter()
                    .map(|(k, v)| (self.convert_case(k), v))
                    .collect()
            })
            .collect();
        let columns: Vec<String> = rows
            .iter()
            .flat_map(|row| row.keys().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let insert = InsertStatement {
            table: entity.table.clone(),
            alias: None,
            columns: columns.clone(),
            rows: rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|column| match row.get(column) {
                            Some(value) => SqlExpr::Param((*value).clone()),
                            None => SqlExpr::Raw("NULL"),
                        })
                        .collect()
                })
                .collect(),
            returning_all: true,
        };
        self.finish_mutation(node, entity, Statement::Insert(insert), aliases)
    }

    /// Compile an update of a single record, optionally filtered.
    pub fn compile_update(&self, node: &SelectionNode) -> BuildResult<Query> {
        let mut aliases = AliasAllocator::new(self.alias_mode);
        let entity = self.mutation_entity(node)?;
        let records = self.input_records(node)?;
        let [record] = records.as_slice() else {
            return Err(BuildError::InvalidInput(
                "update takes exactly one input record".to_string(),
            ));
        };
        debug!("building update entity={}", entity.name);

        let alias = aliases.next();
        let assignments: Vec<(String, SqlExpr)> = record
            .iter()
            .map(|(k, v)| (self.convert_case(k), SqlExpr::Param(v.clone())))
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .collect();
        let where_clause = self.mutation_filter(node, entity, &alias, &mut aliases)?;

        let update = UpdateStatement {
            table: entity.table.clone(),
            alias: Some(alias),
            assignments,
            where_clause,
            returning_all: true,
        };
        self.finish_mutation(node, entity, Statement::Update(update), aliases)
    }

    /// Compile a delete, optionally filtered.
    pub fn compile_delete(&self, node: &SelectionNode) -> BuildResult<Query> {
        let mut aliases = AliasAllocator::new(self.alias_mode);
        let entity = self.mutation_entity(node)?;
        debug!("building delete entity={}", entity.name);

        // Unaliased DELETE; filter columns qualify by the table name.
        let table_name = entity.table.name.clone();
        let where_clause = self.mutation_filter(node, entity, &table_name, &mut aliases)?;
        let delete = DeleteStatement {
            table: entity.table.clone(),
            where_clause,
            returning_all: true,
        };
        self.finish_mutation(node, entity, Statement::Delete(delete), aliases)
    }

    fn mutation_entity(&self, node: &SelectionNode) -> BuildResult<&Entity> {
        let name = node
            .entity
            .as_deref()
            .ok_or_else(|| BuildError::MissingEntity(node.name.clone()))?;
        Ok(self.catalog.entity(name)?)
    }

    fn mutation_filter(
        &self,
        node: &SelectionNode,
        entity: &Entity,
        qualifier: &str,
        aliases: &mut AliasAllocator,
    ) -> BuildResult<Option<SqlExpr>> {
        match &node.arguments.filter {
            Some(filter) => {
                let parsed = FilterMap::parse(filter, &self.operators.vocabulary())?;
                Ok(Some(self.build_filter(qualifier, entity, &parsed, aliases)?))
            }
            None => Ok(None),
        }
    }

    /// Input records, normalized to a list.
    fn input_records(&self, node: &SelectionNode) -> BuildResult<Vec<JsonMap>> {
        let input = node
            .arguments
            .input
            .as_ref()
            .ok_or_else(|| BuildError::MissingInput(node.name.clone()))?;
        match input {
            Value::Object(record) => Ok(vec![record.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object().cloned().ok_or_else(|| {
                        BuildError::InvalidInput(
                            "input list items must be records".to_string(),
                        )
                    })
                })
                .collect(),
            _ => Err(BuildError::InvalidInput(
                "input must be a record or a list of records".to_string(),
            )),
        }
    }

    /// Wrap the statement in a CTE and compile the payload selection.
    fn finish_mutation(
        &self,
        node: &SelectionNode,
        entity: &Entity,
        statement: Statement,
        mut aliases: AliasAllocator,
    ) -> BuildResult<Query> {
        let cte_name = self.convert_case(&node.name);
        let mut projection = Vec::with_capacity(node.children.len());
        let mut rows_affected = false;
        for child in &node.children {
            if child.name == "rows_affected" {
                rows_affected = true;
                continue;
            }
            let scope = self.build_query(
                entity,
                TableRef::new(cte_name.clone()),
                child,
                &mut aliases,
            )?;
            let output = child.output_name().to_string();
            projection.push(SelectItem {
                expr: SqlExpr::Subquery(Box::new(scope.select_json_agg(&output))),
                alias: Some(output),
            });
        }
        if rows_affected {
            projection.push(SelectItem {
                expr: SqlExpr::Subquery(Box::new(SelectQuery {
                    projection: vec![SelectItem {
                        expr: SqlExpr::FuncCall {
                            name: "count",
                            args: vec![SqlExpr::Raw("*")],
                        },
                        alias: None,
                    }],
                    from: Some(FromItem::Table {
                        table: TableRef::new(cte_name.clone()),
                        alias: None,
                    }),
                    ..SelectQuery::default()
                })),
                alias: Some("rows_affected".to_string()),
            });
        }

        if projection.is_empty() {
            return Err(BuildError::EmptySelection(node.name.clone()));
        }

        let payload = SelectQuery {
            with: vec![Cte {
                name: cte_name,
                statement: Box::new(statement),
            }],
            projection,
            ..SelectQuery::default()
        };
        let compiled = render(&Statement::Select(payload), self.dialect.as_ref());
        debug!("compiled mutation sql={} args={:?}", compiled.sql, compiled.args);
        Ok(compiled)
    }
}
