//! Small shared helpers used across the compiler.

/// Convert a camelCase or PascalCase field name to the snake_case column
/// naming convention used by the default column resolver.
///
/// # Examples
/// ```
/// use graphsql::utils::to_snake_case;
///
/// assert_eq!(to_snake_case("fullName"), "full_name");
/// assert_eq!(to_snake_case("Posts"), "posts");
/// assert_eq!(to_snake_case("rows_affected"), "rows_affected");
/// ```
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in s.chars() {
        if ch.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_lower_or_digit = false;
        } else {
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
            out.push(ch);
        }
    }
    out
}

/// Escape a string for embedding in a single-quoted SQL literal.
///
/// Only used for trusted, validated identifiers rendered as JSON object keys;
/// user-supplied values are always bound as positional parameters instead.
pub fn escape_single_quotes(s: &str) -> String {
    s.replace('\'', "''")
}
