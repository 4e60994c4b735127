//! Radix tree router for Keystone.
//!
//! Routes are stored in a radix tree keyed by path segment, so lookup cost
//! depends on the path length rather than on the number of routes. The tree
//! is generic over the value bound to each `(method, path)` pair.
//!
//! # Features
//!
//! - **Path Parameters**: `/users/:id` or `/users/{id}`
//! - **Catch-alls**: `/files/*path`
//! - **Method Fallback**: [`Method::All`] answers any method without its own binding
//! - **405 Support**: [`Lookup::MethodNotAllowed`] carries the bound methods
//! - **Declaration Checks**: duplicate bindings and conflicting parameter
//!   names are reported as [`RouteError`]s
//!
//! # Example
//!
//! ```rust
//! use keystone_router::{join_path, Lookup, Method, Router};
//!
//! let mut router = Router::new();
//! router.insert(Method::Get, &join_path("/api", "/users/:id"), 1).unwrap();
//!
//! assert!(matches!(
//!     router.lookup(&http::Method::GET, "/api/users/9"),
//!     Lookup::Found { value: &1, .. }
//! ));
//! assert!(matches!(
//!     router.lookup(&http::Method::POST, "/api/users/9"),
//!     Lookup::MethodNotAllowed { .. }
//! ));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"        "files"
//!              │               │
//!        ┌─────┴─────┐      "*path"
//!        │           │
//!       (leaf)     ":id"
//!   [GET,POST]       │
//!                  (leaf)
//!              [GET,DELETE]
//! ```

mod error;
mod method;
mod method_router;
mod node;
mod params;
mod path;
mod router;

pub use error::RouteError;
pub use method::Method;
pub use method_router::MethodRouter;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use path::{join_path, parse_pattern, path_shape, Segment};
pub use router::{Lookup, Router};
