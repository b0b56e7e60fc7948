//! The selection tree contract.
//!
//! A [`SelectionNode`] is the canonical, already-resolved form of a requested
//! field: the upstream layer (a GraphQL executor, typically) walks its
//! document, resolves fragments, directives and argument maps, and hands the
//! compiler this tree. The compiler never parses query documents itself.
//!
//! A node's `kind` is derived once from schema metadata and never changes
//! afterwards. Only `Relation`, `Aggregate`, `Object` and `Json` nodes carry
//! children.
//!
//! Relation aggregates follow the `_<relationField>Aggregate` naming
//! convention: an `Aggregate` node named `_postsAggregate` aggregates over the
//! parent entity's `posts` relation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type JsonMap = serde_json::Map<String, Value>;

/// What a selected field is, as resolved from schema metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Plain column projection.
    Scalar,
    /// Structured sub-selection over a JSON column.
    Object,
    /// A relation to another entity.
    Relation,
    /// An aggregate over an entity or relation.
    Aggregate,
    /// A JSON document column.
    Json,
}

/// Sort direction with explicit null ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending, nulls last.
    Asc,
    /// Descending, nulls last.
    Desc,
    /// Ascending, nulls first.
    AscNullsFirst,
    /// Descending, nulls first.
    DescNullsFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderField {
    pub key: String,
    pub direction: OrderDirection,
}

/// Arguments attached to a selection node.
///
/// `filter` stays a raw JSON map here; it is classified into the tagged
/// filter tree by the compiler (see [`crate::filter`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonMap>,
    /// Mutation input: a single record or a list of records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Group keys for aggregate `group` selections.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
}

/// One field in the requested tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub kind: FieldKind,
    /// Logical entity this node resolves to, used for catalog lookups.
    /// Required on roots, relations and aggregates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default)]
    pub arguments: SelectionArguments,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SelectionNode>,
}

impl SelectionNode {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        SelectionNode {
            name: name.into(),
            alias: None,
            kind,
            entity: None,
            arguments: SelectionArguments::default(),
            children: Vec::new(),
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        SelectionNode::new(name, FieldKind::Scalar)
    }

    pub fn json(name: impl Into<String>, children: Vec<SelectionNode>) -> Self {
        SelectionNode::new(name, FieldKind::Json).with_children(children)
    }

    pub fn object(name: impl Into<String>, children: Vec<SelectionNode>) -> Self {
        SelectionNode::new(name, FieldKind::Object).with_children(children)
    }

    pub fn relation(
        name: impl Into<String>,
        entity: impl Into<String>,
        children: Vec<SelectionNode>,
    ) -> Self {
        SelectionNode::new(name, FieldKind::Relation)
            .with_entity(entity)
            .with_children(children)
    }

    pub fn aggregate(
        name: impl Into<String>,
        entity: impl Into<String>,
        children: Vec<SelectionNode>,
    ) -> Self {
        SelectionNode::new(name, FieldKind::Aggregate)
            .with_entity(entity)
            .with_children(children)
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_children(mut self, children: Vec<SelectionNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_arguments(mut self, arguments: SelectionArguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.arguments.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.arguments.offset = Some(offset);
        self
    }

    pub fn with_order_by(mut self, key: impl Into<String>, direction: OrderDirection) -> Self {
        self.arguments.order_by.push(OrderField {
            key: key.into(),
            direction,
        });
        self
    }

    pub fn with_filter(mut self, filter: JsonMap) -> Self {
        self.arguments.filter = Some(filter);
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.arguments.input = Some(input);
        self
    }

    pub fn with_group_by(mut self, keys: Vec<String>) -> Self {
        self.arguments.group_by = keys;
        self
    }

    /// The name this field appears under in the result shape.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// The relation field a `_<field>Aggregate` node aggregates over.
    pub fn aggregate_relation_field(&self) -> Option<&str> {
        self.name
            .strip_prefix('_')
            .and_then(|rest| rest.strip_suffix("Aggregate"))
    }
}
