//! Core middleware trait and types.
//!
//! A middleware step receives the context assembled so far and returns the
//! keys it contributes. It never mutates the context directly; the chain
//! merges the returned [`Additions`] and refuses any key that already exists.
//!
//! # Example
//!
//! ```
//! use keystone_core::{Additions, BoxFuture, KeystoneResult, RequestContext};
//! use keystone_middleware::Middleware;
//!
//! struct Tenant;
//!
//! impl Middleware for Tenant {
//!     fn name(&self) -> &'static str {
//!         "tenant"
//!     }
//!
//!     fn apply<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, KeystoneResult<Additions>> {
//!         Box::pin(async move {
//!             let tenant = ctx.request().header("x-tenant").unwrap_or("public").to_string();
//!             Ok(Additions::new().with("tenant", tenant))
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use keystone_core::{Additions, BoxFuture, KeystoneResult, RequestContext};

/// One step of a route's middleware chain.
///
/// Returning an error aborts the request: a
/// [`DomainError`](keystone_core::DomainError) is sent to the caller as is,
/// anything else becomes a logged, generic 500.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs and collision reports.
    fn name(&self) -> &'static str;

    /// Computes this step's additions from the current context.
    fn apply<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, KeystoneResult<Additions>>;
}

/// Shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A middleware built from an async closure.
///
/// The closure receives its own handle on the context (clones share every
/// value) so it can be moved into the returned future.
///
/// # Example
///
/// ```
/// use keystone_core::{Additions, DomainError};
/// use keystone_middleware::{FnMiddleware, Middleware};
///
/// let auth = FnMiddleware::new("auth", |ctx: keystone_core::RequestContext| async move {
///     match ctx.request().header("authorization") {
///         Some(token) => Ok(Additions::new().with("token", token.to_string())),
///         None => Err(DomainError::unauthorized("Missing credentials")),
///     }
/// });
/// assert_eq!(auth.name(), "auth");
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, E> Middleware for FnMiddleware<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Additions, E>> + Send + 'static,
    E: Into<anyhow::Error>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, KeystoneResult<Additions>> {
        Box::pin(async move { (self.func)(ctx.clone()).await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::{ContextValue, DomainError, InputChannels, RequestHead, ResponseHandle};
    use serde_json::Value;

    fn context() -> RequestContext {
        let head = RequestHead::new(http::Method::GET, "/".parse().unwrap(), http::HeaderMap::new());
        let raw = || ContextValue::new(Value::Null);
        RequestContext::new(
            head,
            ResponseHandle::new(),
            InputChannels {
                params: raw(),
                body: raw(),
                query: raw(),
                cookies: raw(),
            },
        )
    }

    #[tokio::test]
    async fn test_fn_middleware_returns_additions() {
        let mw = FnMiddleware::new("answer", |_ctx: RequestContext| async {
            Ok::<_, anyhow::Error>(Additions::new().with("answer", 42_u8))
        });

        let additions = mw.apply(&context()).await.unwrap();
        assert_eq!(additions.keys().collect::<Vec<_>>(), ["answer"]);
    }

    #[tokio::test]
    async fn test_fn_middleware_converts_domain_error() {
        let mw = FnMiddleware::new("deny", |_ctx: RequestContext| async {
            Err::<Additions, _>(DomainError::forbidden("no"))
        });

        let err = mw.apply(&context()).await.unwrap_err();
        assert!(err.downcast_ref::<DomainError>().is_some());
    }
}
