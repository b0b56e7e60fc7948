use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FilterError {
    #[error("Filter map is empty (must contain at least one condition)")]
    EmptyFilter,

    #[error("Value of logical operator '{0}' must be a list of filter maps")]
    LogicalValueNotList(String),

    #[error("Value of NOT must be a single filter map")]
    NotValueNotMap,

    #[error("Value of field '{0}' must be a map of operators or nested fields")]
    FieldValueNotMap(String),

    #[error("Filter map for field '{0}' mixes operator keys with nested field keys")]
    MixedFilterMap(String),

    #[error("Value of quantifier '{0}' must be a filter map")]
    QuantifierValueNotMap(String),
}
