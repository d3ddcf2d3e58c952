//! Drive query-language builders
//!
//! See <https://developers.google.com/drive/api/guides/search-files>.

/// Clause appended to every listing
pub const NOT_TRASHED: &str = "trashed = false";

/// Quote a value as a query string literal
pub fn literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Restrict a caller predicate to live (non-trashed) objects
pub fn exclude_trashed(query: Option<&str>) -> String {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => format!("({}) and {}", q, NOT_TRASHED),
        None => NOT_TRASHED.to_string(),
    }
}

pub fn in_parent(parent_id: &str) -> String {
    format!("{} in parents", literal(parent_id))
}

pub fn named_in_parent(name: &str, parent_id: &str) -> String {
    format!("name = {} and {}", literal(name), in_parent(parent_id))
}

pub fn name_contains(text: &str) -> String {
    format!("name contains {}", literal(text))
}
