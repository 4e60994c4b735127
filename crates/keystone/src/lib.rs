//! # Keystone
//!
//! **Schema-validated, middleware-composed request pipelines**
//!
//! Keystone lets route authors declare, once per route, what shape of input
//! the route expects and what each middleware step contributes to the
//! request context:
//!
//! - **Schema Validation**: params, body, query and cookies are validated before any user code runs
//! - **Additive Middleware**: steps add context keys and can never overwrite one
//! - **Uniform Errors**: every failure becomes the same JSON envelope
//! - **Subrouting**: route collections mount under path prefixes
//!
//! ## Quick Start
//!
//! ```rust
//! use keystone::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct NewUser {
//!     name: String,
//! }
//!
//! let users = RouteCollection::new()
//!     .route(
//!         Route::post("/users")
//!             .body(Typed::<NewUser>::new())
//!             .handle(|ctx: RequestContext| async move {
//!                 let user = ctx.require::<NewUser>("body")?;
//!                 Ok::<_, anyhow::Error>(serde_json::json!({ "created": user.name }))
//!             }),
//!     )
//!     .unwrap();
//!
//! let mut routes = RouteCollection::new();
//! routes.mount("/api", &users).unwrap();
//!
//! let app = App::new(&routes).unwrap();
//! assert_eq!(app.route_count(), 1);
//! ```
//!
//! ## Request Flow
//!
//! ```text
//! Request → route lookup → params → body → query → cookies → middleware… → handler
//!               │            │        └────────┴───────┘          │            │
//!            404/405        404              400             first error   JSON / 204
//! ```

#![doc(html_root_url = "https://docs.rs/keystone/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod collection;
pub mod dispatch;
pub mod input;
mod route;

pub use app::App;
pub use collection::{RouteCollection, RouteKey};
pub use route::{Handler, Route, RouteEntry, Validators};

// Re-export the building blocks
pub use keystone_core as core;
pub use keystone_middleware as middleware;
pub use keystone_router as router;

/// Prelude module for convenient imports.
///
/// ```rust
/// use keystone::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{App, Handler, Route, RouteCollection, RouteEntry};

    pub use keystone_core::logger::{log_unexpected, reset_error_logger, set_error_logger};
    pub use keystone_core::{
        Additions, Channel, DomainError, ErrorEnvelope, FieldType, FnSchema, Issue, Issues,
        KeystoneResult, ObjectSchema, RequestContext, ResponseHandle, Schema, Typed,
    };
    pub use keystone_middleware::{FnMiddleware, Middleware, MiddlewareChain};
    pub use keystone_router::{join_path, Method, RouteError};
}
