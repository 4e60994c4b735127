//! High-level router API.

use crate::error::RouteError;
use crate::method::Method;
use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::params::Params;

/// Result of resolving a request against a [`Router`].
#[derive(Debug)]
pub enum Lookup<'a, T> {
    /// A route accepts the request.
    Found {
        /// The bound value.
        value: &'a T,
        /// Captured path parameters.
        params: Params,
    },
    /// The path exists but no binding accepts the method.
    MethodNotAllowed {
        /// Methods bound on the path.
        allowed: Vec<http::Method>,
    },
    /// No route matches the path.
    NotFound,
}

/// A radix tree router, generic over the bound value.
///
/// # Example
///
/// ```rust
/// use keystone_router::{Lookup, Method, Router};
///
/// let mut router = Router::new();
/// router.insert(Method::Get, "/users/:id", "getUser").unwrap();
///
/// match router.lookup(&http::Method::GET, "/users/7") {
///     Lookup::Found { value, params } => {
///         assert_eq!(*value, "getUser");
///         assert_eq!(params.get("id"), Some("7"));
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
///
/// # Route Priority
///
/// 1. **Static segments** (e.g., `/users/me`)
/// 2. **Parameter segments** (e.g., `/users/:id`)
/// 3. **Catch-all segments** (e.g., `/files/*path`)
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Binds `value` to `method` at `path`.
    pub fn insert(&mut self, method: Method, path: &str, value: T) -> Result<(), RouteError> {
        self.root.insert(path, method, value)?;
        self.route_count += 1;
        Ok(())
    }

    /// Resolves a request method and path.
    ///
    /// Every route matching the path is tried in priority order; the first
    /// one accepting the method wins. If none does, the methods of all
    /// matching routes are reported.
    #[must_use]
    pub fn lookup(&self, method: &http::Method, path: &str) -> Lookup<'_, T> {
        let mut rejected = Vec::new();
        let found = self.root.find(path, |methods| {
            let value = methods.lookup(method);
            if value.is_none() {
                rejected.push(methods);
            }
            value
        });

        if let Some((value, params)) = found {
            return Lookup::Found { value, params };
        }
        if rejected.is_empty() {
            return Lookup::NotFound;
        }

        let allowed = Method::VARIANTS
            .into_iter()
            .filter(|m| rejected.iter().any(|methods| methods.binds(*m)))
            .filter_map(Method::to_http)
            .collect();
        Lookup::MethodNotAllowed { allowed }
    }

    /// Matches a path without regard to method.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        self.root.match_path(path)
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
