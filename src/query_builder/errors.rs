use thiserror::Error;

use crate::catalog::CatalogError;
use crate::filter::FilterError;
use crate::jsonpath::JsonPathError;

pub type BuildResult<T> = Result<T, BuildError>;

/// Compilation failures. Any error aborts the whole compilation; no partial
/// query is ever returned.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Metadata(#[from] CatalogError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    JsonPath(#[from] JsonPathError),

    #[error("Operator '{0}' is not registered")]
    UnknownOperator(String),

    #[error("Invalid filter shape: {0}")]
    InvalidFilterShape(String),

    #[error("Field '{0}' has a kind that cannot be projected here")]
    UnsupportedFieldKind(String),

    #[error("Selection '{0}' has no fields (select at least one)")]
    EmptySelection(String),

    #[error("Aggregate function '{0}' is not supported")]
    UnknownAggregate(String),

    #[error("Selection '{0}' does not name an entity")]
    MissingEntity(String),

    #[error("Mutation '{0}' requires an input argument")]
    MissingInput(String),

    #[error("Invalid mutation input: {0}")]
    InvalidInput(String),
}
