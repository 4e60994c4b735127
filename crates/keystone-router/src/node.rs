//! Radix tree node implementation.
//!
//! Each node owns one path segment. Static children are kept sorted for
//! binary search; a node has at most one parameter child and at most one
//! catch-all child.

use crate::error::RouteError;
use crate::method::Method;
use crate::method_router::MethodRouter;
use crate::params::Params;
use crate::path::{parse_pattern, Segment};

/// Type of path segment in the radix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static path segment (e.g., "users")
    Static,
    /// Named parameter (e.g., ":id")
    Param(String),
    /// Catch-all wildcard (e.g., "*path")
    Wildcard(String),
}

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// The path segment this node represents
    pub segment: String,

    /// The kind of segment
    pub kind: SegmentKind,

    /// Method table, present when a route ends here
    pub methods: Option<MethodRouter<T>>,

    /// Static children, sorted by segment for binary search
    pub static_children: Vec<Node<T>>,

    /// Parameter child (at most one per node)
    pub param_child: Option<Box<Node<T>>>,

    /// Wildcard child (at most one per node, always a leaf)
    pub wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind(String::new(), SegmentKind::Static)
    }

    /// Inserts a value for `method` at `path`.
    pub fn insert(&mut self, path: &str, method: Method, value: T) -> Result<(), RouteError> {
        let segments = parse_pattern(path)?;
        self.insert_segments(path, &segments, method, value)
    }

    fn insert_segments(
        &mut self,
        path: &str,
        segments: &[Segment],
        method: Method,
        value: T,
    ) -> Result<(), RouteError> {
        let Some((first, remaining)) = segments.split_first() else {
            return self
                .methods
                .get_or_insert_with(MethodRouter::new)
                .set(method, value)
                .map_err(|_| RouteError::Duplicate {
                    method,
                    path: path.to_string(),
                });
        };

        match first {
            Segment::Static(segment) => {
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(index) => index,
                    Err(index) => {
                        let child = Self::with_kind(segment.clone(), SegmentKind::Static);
                        self.static_children.insert(index, child);
                        index
                    }
                };
                self.static_children[index].insert_segments(path, remaining, method, value)
            }
            Segment::Param(name) => {
                let child = self.param_child.get_or_insert_with(|| {
                    Box::new(Self::with_kind(
                        format!(":{name}"),
                        SegmentKind::Param(name.clone()),
                    ))
                });
                check_name(path, &child.kind, name)?;
                child.insert_segments(path, remaining, method, value)
            }
            Segment::Wildcard(name) => {
                let child = self.wildcard_child.get_or_insert_with(|| {
                    Box::new(Self::with_kind(
                        format!("*{name}"),
                        SegmentKind::Wildcard(name.clone()),
                    ))
                });
                check_name(path, &child.kind, name)?;
                child.insert_segments(path, remaining, method, value)
            }
        }
    }

    /// Matches a request path against the tree.
    ///
    /// Returns the first method table on a matching path and the extracted
    /// parameters.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        self.find(path, Some)
    }

    /// Walks every route matching `path` in priority order until `accept`
    /// returns a value.
    ///
    /// Branches whose table `accept` rejects are backtracked out of, so a
    /// lower-priority branch can still answer.
    pub fn find<'a, R, F>(&'a self, path: &str, mut accept: F) -> Option<(R, Params)>
    where
        F: FnMut(&'a MethodRouter<T>) -> Option<R>,
    {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let found = self.find_segments(&segments, &mut params, &mut accept)?;
        Some((found, params))
    }

    fn find_segments<'a, R, F>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
        accept: &mut F,
    ) -> Option<R>
    where
        F: FnMut(&'a MethodRouter<T>) -> Option<R>,
    {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.methods.as_ref().and_then(|methods| accept(methods));
        };

        // Static first, then parameter, then catch-all.
        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.find_segments(remaining, params, accept) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), *segment);
                if let Some(found) = child.find_segments(remaining, params, accept) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.wildcard_child {
            if let (SegmentKind::Wildcard(name), Some(methods)) = (&child.kind, &child.methods) {
                let mark = params.len();
                params.push(name.clone(), segments.join("/"));
                if let Some(found) = accept(methods) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Self> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

fn check_name(path: &str, kind: &SegmentKind, name: &str) -> Result<(), RouteError> {
    match kind {
        SegmentKind::Param(existing) | SegmentKind::Wildcard(existing) if existing != name => {
            Err(RouteError::ParamConflict {
                path: path.to_string(),
                existing: existing.clone(),
                new: name.to_string(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(root: &Node<&'static str>, path: &str) -> Option<(&'static str, Params)> {
        root.match_path(path)
            .and_then(|(m, p)| m.lookup(&http::Method::GET).map(|v| (*v, p)))
    }

    #[test]
    fn test_insert_and_match_static() {
        let mut root = Node::root();
        root.insert("/users", Method::Get, "listUsers").unwrap();

        let (value, params) = get(&root, "/users").unwrap();
        assert_eq!(value, "listUsers");
        assert!(params.is_empty());
        assert!(get(&root, "/posts").is_none());
    }

    #[test]
    fn test_insert_and_match_param() {
        let mut root = Node::root();
        root.insert("/users/:id", Method::Get, "getUser").unwrap();

        let (value, params) = get(&root, "/users/123").unwrap();
        assert_eq!(value, "getUser");
        assert_eq!(params.get("id"), Some("123"));
    }

    #[test]
    fn test_insert_and_match_wildcard() {
        let mut root = Node::root();
        root.insert("/files/*path", Method::Get, "serveFile").unwrap();

        let (_, params) = get(&root, "/files/images/logo.png").unwrap();
        assert_eq!(params.get("path"), Some("images/logo.png"));
    }

    #[test]
    fn test_static_priority_over_param() {
        let mut root = Node::root();
        root.insert("/users/me", Method::Get, "me").unwrap();
        root.insert("/users/{id}", Method::Get, "user").unwrap();

        assert_eq!(get(&root, "/users/me").unwrap().0, "me");
        assert_eq!(get(&root, "/users/42").unwrap().0, "user");
    }

    #[test]
    fn test_backtracking_drops_stale_params() {
        let mut root = Node::root();
        root.insert("/a/:x/b", Method::Get, "param").unwrap();
        root.insert("/a/*rest", Method::Get, "rest").unwrap();

        let (value, params) = get(&root, "/a/1/c").unwrap();
        assert_eq!(value, "rest");
        assert_eq!(params.get("x"), None);
        assert_eq!(params.get("rest"), Some("1/c"));
    }

    #[test]
    fn test_rejected_branch_falls_through_to_catch_all() {
        let mut root = Node::root();
        root.insert("/a/:x", Method::Get, "show").unwrap();
        root.insert("/a/*rest", Method::Post, "upload").unwrap();

        let (value, params) = root
            .find("/a/1", |m| m.lookup(&http::Method::POST))
            .unwrap();
        assert_eq!(*value, "upload");
        assert_eq!(params.get("x"), None);
        assert_eq!(params.get("rest"), Some("1"));

        assert_eq!(get(&root, "/a/1").unwrap().0, "show");
    }

    #[test]
    fn test_duplicate_method_is_rejected() {
        let mut root = Node::root();
        root.insert("/users", Method::Get, "a").unwrap();
        assert_eq!(
            root.insert("/users/", Method::Get, "b"),
            Err(RouteError::Duplicate {
                method: Method::Get,
                path: "/users/".to_string()
            })
        );
        assert!(root.insert("/users", Method::Post, "c").is_ok());
    }

    #[test]
    fn test_param_name_conflict() {
        let mut root = Node::root();
        root.insert("/users/:id", Method::Get, "a").unwrap();
        let err = root.insert("/users/:uid/posts", Method::Get, "b").unwrap_err();
        assert!(matches!(err, RouteError::ParamConflict { existing, new, .. }
            if existing == "id" && new == "uid"));
    }

    #[test]
    fn test_root_route() {
        let mut root = Node::root();
        root.insert("/", Method::Get, "root").unwrap();
        assert_eq!(get(&root, "/").unwrap().0, "root");
    }
}
