//! Entity catalog: the metadata the compiler resolves selection trees against.
//!
//! The catalog maps logical entity names to physical tables and declares, per
//! field, whether it is a plain column, a JSON document column, or a relation
//! to another entity. Relation descriptors carry cardinality and join keys;
//! many-to-many relations additionally name a junction table.
//!
//! Catalogs are immutable once constructed and shared read-only across any
//! number of concurrent compilations. They are either assembled
//! programmatically or loaded from a YAML definition (see [`config`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub mod config;
mod errors;

pub use config::CatalogConfig;
pub use errors::CatalogError;

/// A resolved physical table reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        TableRef {
            name: name.into(),
            schema: None,
        }
    }

    pub fn with_schema(name: impl Into<String>, schema: impl Into<String>) -> Self {
        TableRef {
            name: name.into(),
            schema: Some(schema.into()),
        }
    }
}

/// Relation cardinality, driving the join/aggregation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

/// Junction table of a many-to-many relation.
///
/// `local_keys` pair with the parent entity's `RelationDescriptor::local_keys`;
/// `referenced_keys` pair with the target entity's
/// `RelationDescriptor::referenced_keys`. All keys are physical column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunctionTable {
    pub table: String,
    pub local_keys: Vec<String>,
    pub referenced_keys: Vec<String>,
}

/// Declares how a relation field joins its parent entity to a target entity.
///
/// Keys are physical column names, not field names; they are used verbatim in
/// join conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Logical name of the target entity.
    pub target: String,
    pub cardinality: Cardinality,
    /// Columns on the parent entity's table.
    pub local_keys: Vec<String>,
    /// Columns on the target entity's table.
    pub referenced_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction: Option<JunctionTable>,
}

/// What a field of an entity maps to in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// A plain scalar column.
    Scalar,
    /// A JSON/JSONB document column; filtered through the JSONPath compiler
    /// and projected via JSON object construction.
    Json,
    /// A relation to another entity.
    Relation(RelationDescriptor),
}

/// Per-field metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub field_type: FieldType,
    /// Overrides the column derived from the field name, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl FieldDef {
    pub fn scalar() -> Self {
        FieldDef {
            field_type: FieldType::Scalar,
            column: None,
        }
    }

    pub fn json() -> Self {
        FieldDef {
            field_type: FieldType::Json,
            column: None,
        }
    }

    pub fn relation(descriptor: RelationDescriptor) -> Self {
        FieldDef {
            field_type: FieldType::Relation(descriptor),
            column: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// A logical entity and its physical mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub table: TableRef,
    #[serde(default)]
    pub fields: HashMap<String, FieldDef>,
}

impl Entity {
    pub fn new(name: impl Into<String>, table: TableRef) -> Self {
        Entity {
            name: name.into(),
            table,
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn field(&self, name: &str) -> Result<&FieldDef, CatalogError> {
        self.fields
            .get(name)
            .ok_or_else(|| CatalogError::FieldNotFound(self.name.clone(), name.to_string()))
    }

    /// Resolve a field to its relation descriptor.
    pub fn relation(&self, field: &str) -> Result<&RelationDescriptor, CatalogError> {
        match &self.field(field)?.field_type {
            FieldType::Relation(rel) => Ok(rel),
            _ => Err(CatalogError::NotARelation(
                self.name.clone(),
                field.to_string(),
            )),
        }
    }
}

/// The immutable entity catalog the compiler is constructed with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    entities: HashMap<String, Entity>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Add an entity, validating every relation descriptor it declares.
    pub fn add_entity(&mut self, entity: Entity) -> Result<(), CatalogError> {
        for (field, def) in &entity.fields {
            if let FieldType::Relation(rel) = &def.field_type {
                validate_relation(&format!("{}.{}", entity.name, field), rel)?;
            }
        }
        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    pub fn with_entity(mut self, entity: Entity) -> Result<Self, CatalogError> {
        self.add_entity(entity)?;
        Ok(self)
    }

    pub fn entity(&self, name: &str) -> Result<&Entity, CatalogError> {
        self.entities
            .get(name)
            .ok_or_else(|| CatalogError::EntityNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn validate_relation(name: &str, rel: &RelationDescriptor) -> Result<(), CatalogError> {
    if rel.local_keys.is_empty() || rel.referenced_keys.is_empty() {
        return Err(CatalogError::EmptyKeys(name.to_string()));
    }
    if rel.local_keys.len() != rel.referenced_keys.len() {
        return Err(CatalogError::KeyArityMismatch(name.to_string()));
    }
    match (&rel.cardinality, &rel.junction) {
        (Cardinality::ManyToMany, None) => Err(CatalogError::MissingJunction(name.to_string())),
        (Cardinality::ManyToMany, Some(junction)) => {
            if junction.local_keys.len() != rel.local_keys.len()
                || junction.referenced_keys.len() != rel.referenced_keys.len()
            {
                return Err(CatalogError::JunctionKeyArityMismatch(name.to_string()));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
