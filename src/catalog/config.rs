//! Declarative catalog configuration.
//!
//! Catalogs are defined in YAML with the following structure:
//!
//! ```yaml
//! entities:
//!   Post:
//!     table: posts
//!     schema: app            # optional
//!     fields:
//!       id: {}
//!       metadata:
//!         kind: json
//!       author:
//!         kind: relation
//!         relation:
//!           target: User
//!           cardinality: one_to_one
//!           local_keys: [author_id]
//!           referenced_keys: [id]
//!       categories:
//!         kind: relation
//!         relation:
//!           target: Category
//!           cardinality: many_to_many
//!           local_keys: [id]
//!           referenced_keys: [id]
//!           junction:
//!             table: posts_to_categories
//!             local_keys: [post_id]
//!             referenced_keys: [category_id]
//! ```
//!
//! A field with no `kind` is a scalar column; `column` overrides the
//! snake_case column derived from the field name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Catalog, CatalogError, Entity, FieldDef, FieldType, RelationDescriptor, TableRef};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub entities: HashMap<String, EntityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, FieldConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKindConfig {
    #[default]
    Scalar,
    Json,
    Relation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default)]
    pub kind: FieldKindConfig,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub relation: Option<RelationDescriptor>,
}

impl CatalogConfig {
    /// Parse a YAML catalog definition.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::InvalidConfig(e.to_string()))
    }

    /// Build the validated, immutable catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::new();
        for (name, entity_cfg) in self.entities {
            let table = match entity_cfg.schema {
                Some(schema) => TableRef::with_schema(entity_cfg.table, schema),
                None => TableRef::new(entity_cfg.table),
            };
            let mut entity = Entity::new(name.clone(), table);
            for (field_name, field_cfg) in entity_cfg.fields {
                let field_type = match field_cfg.kind {
                    FieldKindConfig::Scalar => FieldType::Scalar,
                    FieldKindConfig::Json => FieldType::Json,
                    FieldKindConfig::Relation => {
                        let rel = field_cfg.relation.ok_or_else(|| {
                            CatalogError::InvalidConfig(format!(
                                "field '{}.{}' is declared as a relation but has no relation block",
                                name, field_name
                            ))
                        })?;
                        FieldType::Relation(rel)
                    }
                };
                entity.fields.insert(
                    field_name,
                    FieldDef {
                        field_type,
                        column: field_cfg.column,
                    },
                );
            }
            catalog.add_entity(entity)?;
        }
        Ok(catalog)
    }
}

/// Load a catalog straight from a YAML definition.
pub fn catalog_from_yaml(yaml: &str) -> Result<Catalog, CatalogError> {
    CatalogConfig::from_yaml(yaml)?.build()
}
