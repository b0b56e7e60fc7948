use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsonPathError {
    #[error("Path cannot be empty")]
    EmptyPath,

    #[error("Invalid path format: {0}")]
    InvalidPath(String),

    #[error("Filter map has no conditions")]
    EmptyFilter,

    #[error("Unsupported operator '{0}' in JSON path filter")]
    UnsupportedOperator(String),

    #[error("Operator '{0}' has no inverse and cannot be used under 'all'")]
    UnsupportedQuantifier(String),

    #[error("Pattern operator '{0}' requires a string value")]
    PatternNotString(String),

    #[error("Value of isNull must be a boolean")]
    NullFlagNotBoolean,
}
