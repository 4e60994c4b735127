//! # Keystone Middleware
//!
//! Ordered, additive middleware for Keystone routes.
//!
//! ```text
//! initial context ─▶ step 1 ─▶ merge ─▶ step 2 ─▶ merge ─▶ … ─▶ handler
//!                      │                  │
//!                      └── error ─────────┴──▶ PipelineError (first failure wins)
//! ```
//!
//! ## Key Features
//!
//! - **Additive**: steps return [`Additions`](keystone_core::Additions); they cannot overwrite keys
//! - **Ordered**: declaration order, each step sees earlier additions
//! - **Short-circuit**: the first error, collision or panic stops the chain
//!
//! ## Example
//!
//! ```
//! use keystone_core::{Additions, RequestContext};
//! use keystone_middleware::{FnMiddleware, MiddlewareChain};
//!
//! let chain = MiddlewareChain::new()
//!     .with(FnMiddleware::new("a", |_: RequestContext| async {
//!         Ok::<_, anyhow::Error>(Additions::new().with("a", 1))
//!     }))
//!     .with(FnMiddleware::new("b", |_: RequestContext| async {
//!         Ok::<_, anyhow::Error>(Additions::new().with("b", 2))
//!     }));
//!
//! assert_eq!(chain.names(), ["a", "b"]);
//! ```

#![doc(html_root_url = "https://docs.rs/keystone-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod middleware;

pub use chain::MiddlewareChain;
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware};
