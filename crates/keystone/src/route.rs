//! Route declaration.
//!
//! A route is built by naming its method and path, optionally declaring a
//! schema per channel, appending middleware steps in order, and finally
//! sealing it with a handler:
//!
//! ```
//! use keystone::prelude::*;
//! use serde_json::{json, Value};
//!
//! let entry = Route::get("/users/:id")
//!     .params(ObjectSchema::new().required("id", FieldType::NumericString))
//!     .with(FnMiddleware::new("tenant", |_ctx: RequestContext| async {
//!         Ok::<_, anyhow::Error>(Additions::new().with("tenant", "acme"))
//!     }))
//!     .handle(|ctx: RequestContext| async move {
//!         let params = ctx.params::<serde_json::Map<String, Value>>().cloned();
//!         Ok::<_, DomainError>(json!({ "params": params }))
//!     });
//!
//! assert_eq!(entry.path(), "/users/:id");
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use keystone_core::{BoxFuture, BoxedSchema, Channel, KeystoneResult, RequestContext, Schema};
use keystone_middleware::{BoxedMiddleware, Middleware, MiddlewareChain};
use keystone_router::Method;
use serde::Serialize;
use serde_json::Value;

/// The final step of a route.
///
/// Implemented for every async closure taking a [`RequestContext`] and
/// returning `Result<T, E>` where `T: Serialize`. The value becomes the
/// JSON response body; `null` (including `()`) becomes `204 No Content`.
pub trait Handler: Send + Sync + 'static {
    /// Runs the handler.
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, KeystoneResult<Value>>;
}

impl<F, Fut, T, E> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize,
    E: Into<anyhow::Error>,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, KeystoneResult<Value>> {
        let fut = self(ctx);
        Box::pin(async move {
            let output = fut.await.map_err(Into::into)?;
            serde_json::to_value(output)
                .map_err(|e| anyhow::Error::new(e).context("failed to serialize handler output"))
        })
    }
}

/// Optional schema per channel.
#[derive(Clone, Default)]
pub struct Validators {
    params: Option<BoxedSchema>,
    body: Option<BoxedSchema>,
    query: Option<BoxedSchema>,
    cookies: Option<BoxedSchema>,
}

impl Validators {
    /// Returns the schema declared for `channel`.
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&BoxedSchema> {
        match channel {
            Channel::Params => self.params.as_ref(),
            Channel::Body => self.body.as_ref(),
            Channel::Query => self.query.as_ref(),
            Channel::Cookies => self.cookies.as_ref(),
        }
    }

    /// Declares the schema for `channel`, replacing any earlier one.
    pub fn set(&mut self, channel: Channel, schema: BoxedSchema) {
        let slot = match channel {
            Channel::Params => &mut self.params,
            Channel::Body => &mut self.body,
            Channel::Query => &mut self.query,
            Channel::Cookies => &mut self.cookies,
        };
        *slot = Some(schema);
    }

    /// Returns the channels that have a schema.
    #[must_use]
    pub fn declared(&self) -> Vec<Channel> {
        [Channel::Params, Channel::Body, Channel::Query, Channel::Cookies]
            .into_iter()
            .filter(|c| self.get(*c).is_some())
            .collect()
    }
}

impl fmt::Debug for Validators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validators")
            .field("declared", &self.declared())
            .finish()
    }
}

/// Builder for a [`RouteEntry`].
#[derive(Debug)]
#[must_use = "a route does nothing until it is sealed with `handle`"]
pub struct Route {
    method: Method,
    path: String,
    validators: Validators,
    chain: MiddlewareChain,
}

impl Route {
    /// Starts a route for `method` at `path`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            validators: Validators::default(),
            chain: MiddlewareChain::new(),
        }
    }

    /// Starts a route answering every method without a specific binding.
    pub fn all(path: impl Into<String>) -> Self {
        Self::new(Method::All, path)
    }

    /// Starts a `GET` route.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Starts a `POST` route.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Starts a `PUT` route.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Starts a `DELETE` route.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Starts a `PATCH` route.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// Starts an `OPTIONS` route.
    pub fn options(path: impl Into<String>) -> Self {
        Self::new(Method::Options, path)
    }

    /// Starts a `HEAD` route.
    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::Head, path)
    }

    /// Declares the path parameter schema. Failures answer 404.
    pub fn params<S: Schema>(self, schema: S) -> Self {
        self.schema(Channel::Params, Arc::new(schema))
    }

    /// Declares the body schema.
    pub fn body<S: Schema>(self, schema: S) -> Self {
        self.schema(Channel::Body, Arc::new(schema))
    }

    /// Declares the query schema.
    pub fn query<S: Schema>(self, schema: S) -> Self {
        self.schema(Channel::Query, Arc::new(schema))
    }

    /// Declares the cookie schema.
    pub fn cookies<S: Schema>(self, schema: S) -> Self {
        self.schema(Channel::Cookies, Arc::new(schema))
    }

    /// Declares an already shared schema for `channel`.
    pub fn schema(mut self, channel: Channel, schema: BoxedSchema) -> Self {
        self.validators.set(channel, schema);
        self
    }

    /// Appends a middleware step.
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.chain.push(middleware);
        self
    }

    /// Appends a shared middleware step.
    pub fn with_boxed(mut self, middleware: BoxedMiddleware) -> Self {
        self.chain.push_boxed(middleware);
        self
    }

    /// Seals the route with its handler.
    pub fn handle<H: Handler>(self, handler: H) -> RouteEntry {
        RouteEntry {
            method: self.method,
            path: self.path,
            validators: self.validators,
            chain: self.chain,
            handler: Arc::new(handler),
        }
    }
}

/// A sealed route: method, path, validators, middleware chain and handler.
#[derive(Clone)]
pub struct RouteEntry {
    method: Method,
    path: String,
    validators: Validators,
    chain: MiddlewareChain,
    handler: Arc<dyn Handler>,
}

impl RouteEntry {
    /// Returns the method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Returns the path pattern.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the declared validators.
    #[must_use]
    pub const fn validators(&self) -> &Validators {
        &self.validators
    }

    /// Returns the middleware chain.
    #[must_use]
    pub const fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    /// Returns a copy bound at another path, sharing everything else.
    #[must_use]
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("validators", &self.validators)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
