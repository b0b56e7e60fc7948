//! Path whitelist validation.
//!
//! Field paths come straight from client filter maps and end up inside the
//! path template text, so they are the one place a value-shaped string could
//! alter the compiled predicate. Validation is a strict whitelist grammar:
//! `identifier (. identifier | [non-negative-integer])*`. Anything else,
//! including wildcard or negative indices, is rejected.

use lazy_static::lazy_static;
use regex::Regex;

use super::JsonPathError;

lazy_static! {
    static ref PATH_RE: Regex = Regex::new(
        r"^[A-Za-z_][A-Za-z0-9_]*(\[[0-9]+\])*(\.[A-Za-z_][A-Za-z0-9_]*(\[[0-9]+\])*)*$"
    )
    .unwrap();
}

/// Validate a client-supplied field path.
pub fn validate_path(path: &str) -> Result<(), JsonPathError> {
    if path.is_empty() {
        return Err(JsonPathError::EmptyPath);
    }
    if !PATH_RE.is_match(path) {
        return Err(JsonPathError::InvalidPath(path.to_string()));
    }
    Ok(())
}
