//! Route collections and subrouting.

use std::sync::Arc;

use indexmap::IndexMap;
use keystone_router::{join_path, path_shape, Method, RouteError};

use crate::route::RouteEntry;

/// Identity of a route inside a collection: its method and the shape of
/// its path with parameter names erased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    method: Method,
    shape: String,
}

impl RouteKey {
    /// Computes the key of `method` at `path`.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            shape: path_shape(path),
        }
    }

    /// Returns the method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Returns the normalized path shape.
    #[must_use]
    pub fn shape(&self) -> &str {
        &self.shape
    }
}

/// An ordered set of routes, composable by mounting.
///
/// # Example
///
/// ```
/// use keystone::prelude::*;
///
/// let widgets = RouteCollection::new()
///     .route(Route::get("/widget/:id").handle(|_ctx: RequestContext| async {
///         Ok::<_, DomainError>("widget")
///     }))
///     .unwrap();
///
/// let mut api = RouteCollection::new();
/// api.mount("/api", &widgets).unwrap();
///
/// assert!(api.get(Method::Get, "/api/widget/:id").is_some());
/// assert!(widgets.get(Method::Get, "/widget/:id").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteCollection {
    entries: IndexMap<RouteKey, Arc<RouteEntry>>,
}

impl RouteCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route.
    pub fn register(&mut self, entry: RouteEntry) -> Result<&mut Self, RouteError> {
        let key = RouteKey::new(entry.method(), entry.path());
        if self.entries.contains_key(&key) {
            return Err(RouteError::Duplicate {
                method: entry.method(),
                path: entry.path().to_string(),
            });
        }
        self.entries.insert(key, Arc::new(entry));
        Ok(self)
    }

    /// Adds a route, builder style.
    pub fn route(mut self, entry: RouteEntry) -> Result<Self, RouteError> {
        self.register(entry)?;
        Ok(self)
    }

    /// Copies every route of `child` into this collection under `prefix`.
    ///
    /// An empty prefix unions the routes as they are. `child` is left
    /// untouched. Nothing is added if any resulting key already exists.
    pub fn mount(&mut self, prefix: &str, child: &Self) -> Result<&mut Self, RouteError> {
        let mut staged: IndexMap<RouteKey, Arc<RouteEntry>> = IndexMap::with_capacity(child.len());

        for entry in child.entries.values() {
            let entry = if prefix.is_empty() {
                entry.clone()
            } else {
                Arc::new(entry.with_path(join_path(prefix, entry.path())))
            };
            let key = RouteKey::new(entry.method(), entry.path());
            if self.entries.contains_key(&key) || staged.contains_key(&key) {
                return Err(RouteError::Duplicate {
                    method: entry.method(),
                    path: entry.path().to_string(),
                });
            }
            staged.insert(key, entry);
        }

        tracing::debug!(prefix, routes = staged.len(), "mounted route collection");
        self.entries.extend(staged);
        Ok(self)
    }

    /// Mounts `child` under `prefix`, builder style.
    pub fn nest(mut self, prefix: &str, child: &Self) -> Result<Self, RouteError> {
        self.mount(prefix, child)?;
        Ok(self)
    }

    /// Unions `other` into this collection without a prefix.
    pub fn merge(&mut self, other: &Self) -> Result<&mut Self, RouteError> {
        self.mount("", other)
    }

    /// Looks up a route by method and path pattern.
    #[must_use]
    pub fn get(&self, method: Method, path: &str) -> Option<&RouteEntry> {
        self.entries
            .get(&RouteKey::new(method, path))
            .map(Arc::as_ref)
    }

    /// Iterates over the routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.entries.values()
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Route;
    use keystone_core::{DomainError, RequestContext};

    fn entry(route: Route) -> RouteEntry {
        route.handle(|_ctx: RequestContext| async { Ok::<_, DomainError>(()) })
    }

    #[test]
    fn test_register_rejects_same_shape() {
        let mut routes = RouteCollection::new();
        routes.register(entry(Route::get("/a/:id"))).unwrap();

        let err = routes.register(entry(Route::get("/a/{key}"))).unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                method: Method::Get,
                path: "/a/{key}".to_string()
            }
        );
        assert!(routes.register(entry(Route::post("/a/:id"))).is_ok());
        assert!(routes.register(entry(Route::all("/a/:id"))).is_ok());
        assert_eq!(routes.len(), 3);
    }

    #[test]
    fn test_mount_prefixes_and_keeps_child() {
        let child = RouteCollection::new()
            .route(entry(Route::get("/widget/:id")))
            .unwrap()
            .route(entry(Route::get("/")))
            .unwrap();

        let mut parent = RouteCollection::new()
            .route(entry(Route::get("/health")))
            .unwrap();
        parent.mount("/api/", &child).unwrap();

        let paths: Vec<_> = parent.iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, ["/health", "/api/widget/:id", "/api"]);
        assert_eq!(child.get(Method::Get, "/widget/:id").unwrap().path(), "/widget/:id");
    }

    #[test]
    fn test_mount_twice_under_different_prefixes() {
        let child = RouteCollection::new()
            .route(entry(Route::get("/items")))
            .unwrap();

        let parent = RouteCollection::new()
            .nest("/v1", &child)
            .unwrap()
            .nest("/v2", &child)
            .unwrap();

        assert!(parent.get(Method::Get, "/v1/items").is_some());
        assert!(parent.get(Method::Get, "/v2/items").is_some());
    }

    #[test]
    fn test_mount_conflict_is_atomic() {
        let child = RouteCollection::new()
            .route(entry(Route::get("/fresh")))
            .unwrap()
            .route(entry(Route::get("/taken")))
            .unwrap();

        let mut parent = RouteCollection::new()
            .route(entry(Route::get("/api/taken")))
            .unwrap();

        let err = parent.mount("/api", &child).unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { path, .. } if path == "/api/taken"));
        assert_eq!(parent.len(), 1);
        assert!(parent.get(Method::Get, "/api/fresh").is_none());
    }

    #[test]
    fn test_merge_unions_without_prefix() {
        let a = RouteCollection::new().route(entry(Route::get("/a"))).unwrap();
        let b = RouteCollection::new().route(entry(Route::get("/b"))).unwrap();

        let mut all = a.clone();
        all.merge(&b).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.merge(&a).is_err());
    }
}
