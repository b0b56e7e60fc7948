use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Entity '{0}' not found in catalog (check catalog configuration)")]
    EntityNotFound(String),

    #[error("Field '{1}' not found on entity '{0}'")]
    FieldNotFound(String, String),

    #[error("Field '{1}' on entity '{0}' is not a relation")]
    NotARelation(String, String),

    #[error("Relation '{0}' must declare the same number of local and referenced keys")]
    KeyArityMismatch(String),

    #[error("Relation '{0}' must declare at least one key pair")]
    EmptyKeys(String),

    #[error("Many-to-many relation '{0}' is missing its junction table definition")]
    MissingJunction(String),

    #[error("Junction table of relation '{0}' must declare the same number of keys on both sides")]
    JunctionKeyArityMismatch(String),

    #[error("Failed to parse catalog configuration: {0}")]
    InvalidConfig(String),
}
