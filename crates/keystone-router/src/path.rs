//! Path pattern helpers.

use crate::error::RouteError;

/// One parsed segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text.
    Static(String),
    /// Named parameter (`:id` or `{id}`).
    Param(String),
    /// Catch-all (`*rest`), always last.
    Wildcard(String),
}

/// Parses a route pattern into segments. Empty segments are ignored.
pub fn parse_pattern(path: &str) -> Result<Vec<Segment>, RouteError> {
    let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = Vec::with_capacity(raw.len());

    for (i, s) in raw.iter().enumerate() {
        let segment = if let Some(name) = s.strip_prefix(':') {
            Segment::Param(name.to_string())
        } else if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Segment::Param(name.to_string())
        } else if let Some(name) = s.strip_prefix('*') {
            if i + 1 != raw.len() {
                return Err(RouteError::WildcardNotLast(path.to_string()));
            }
            Segment::Wildcard(name.to_string())
        } else {
            Segment::Static((*s).to_string())
        };

        if matches!(&segment, Segment::Param(n) if n.is_empty()) {
            return Err(RouteError::UnnamedParam(path.to_string()));
        }
        segments.push(segment);
    }

    Ok(segments)
}

/// Returns the effective shape of a pattern: parameter names are erased, so
/// `/a/:id` and `/a/{key}` have the same shape (`/a/:`).
#[must_use]
pub fn path_shape(path: &str) -> String {
    let shape: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with(':') || (s.starts_with('{') && s.ends_with('}')) {
                ":"
            } else if s.starts_with('*') {
                "*"
            } else {
                s
            }
        })
        .collect();
    format!("/{}", shape.join("/"))
}

/// Joins a mount prefix and a route path.
///
/// The result has exactly one `/` between the parts, always starts with `/`
/// and has no trailing `/` unless it is the root.
///
/// ```
/// use keystone_router::join_path;
///
/// assert_eq!(join_path("/api/", "/users"), "/api/users");
/// assert_eq!(join_path("api", "users/"), "/api/users");
/// assert_eq!(join_path("", "/"), "/");
/// ```
#[must_use]
pub fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_matches('/');

    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => format!("/{prefix}"),
        (true, false) => format!("/{path}"),
        (false, false) => format!("/{prefix}/{path}"),
    }
}
