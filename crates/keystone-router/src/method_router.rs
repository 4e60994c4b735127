//! Per-path method table.
//!
//! [`MethodRouter`] holds at most one value per [`Method`] for a single
//! path, including the `All` fallback.

use crate::method::Method;

/// Maps methods to values for one route path.
///
/// # Example
///
/// ```rust
/// use keystone_router::{Method, MethodRouter};
///
/// let mut router = MethodRouter::new();
/// router.set(Method::Get, "listUsers").unwrap();
/// router.set(Method::All, "fallback").unwrap();
///
/// assert_eq!(router.lookup(&http::Method::GET), Some(&"listUsers"));
/// assert_eq!(router.lookup(&http::Method::DELETE), Some(&"fallback"));
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    all: Option<T>,
    get: Option<T>,
    post: Option<T>,
    put: Option<T>,
    delete: Option<T>,
    patch: Option<T>,
    options: Option<T>,
    head: Option<T>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            all: None,
            get: None,
            post: None,
            put: None,
            delete: None,
            patch: None,
            options: None,
            head: None,
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, method: Method) -> &Option<T> {
        match method {
            Method::All => &self.all,
            Method::Get => &self.get,
            Method::Post => &self.post,
            Method::Put => &self.put,
            Method::Delete => &self.delete,
            Method::Patch => &self.patch,
            Method::Options => &self.options,
            Method::Head => &self.head,
        }
    }

    fn slot_mut(&mut self, method: Method) -> &mut Option<T> {
        match method {
            Method::All => &mut self.all,
            Method::Get => &mut self.get,
            Method::Post => &mut self.post,
            Method::Put => &mut self.put,
            Method::Delete => &mut self.delete,
            Method::Patch => &mut self.patch,
            Method::Options => &mut self.options,
            Method::Head => &mut self.head,
        }
    }

    /// Binds `value` to `method`.
    ///
    /// An existing binding is never replaced; the rejected value is handed
    /// back instead.
    pub fn set(&mut self, method: Method, value: T) -> Result<(), T> {
        let slot = self.slot_mut(method);
        if slot.is_some() {
            return Err(value);
        }
        *slot = Some(value);
        Ok(())
    }

    /// Returns the value bound exactly to `method`.
    #[must_use]
    pub fn get(&self, method: Method) -> Option<&T> {
        self.slot(method).as_ref()
    }

    /// Resolves a request method: the specific binding first, then `GET`
    /// for a `HEAD` request, then `All`.
    #[must_use]
    pub fn lookup(&self, method: &http::Method) -> Option<&T> {
        Method::from_http(method)
            .and_then(|m| self.get(m))
            .or_else(|| {
                if *method == http::Method::HEAD {
                    self.get.as_ref()
                } else {
                    None
                }
            })
            .or(self.all.as_ref())
    }

    /// Returns `true` if a request for `method` has a binding of its own,
    /// counting `HEAD` as served by `GET`.
    #[must_use]
    pub fn binds(&self, method: Method) -> bool {
        self.slot(method).is_some() || (method == Method::Head && self.get.is_some())
    }

    /// Returns `true` if any method is bound.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        Method::VARIANTS.into_iter().any(|m| self.slot(m).is_some())
    }

    /// Returns the request methods bound on this path, for an `Allow` header.
    ///
    /// Empty when an `All` binding accepts everything.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<http::Method> {
        if self.all.is_some() {
            return Vec::new();
        }
        Method::VARIANTS
            .into_iter()
            .filter(|m| self.binds(*m))
            .filter_map(Method::to_http)
            .collect()
    }
}
