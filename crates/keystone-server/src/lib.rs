//! # Keystone Server
//!
//! HTTP/1.1 transport for a compiled [`keystone::App`], built on hyper and
//! tokio.
//!
//! - One task per connection, requests dispatched concurrently
//! - Request body limit and optional per-request timeout (504 envelope)
//! - Graceful shutdown on SIGTERM/SIGINT or a programmatic [`ShutdownSignal`]

#![doc(html_root_url = "https://docs.rs/keystone-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod server;
pub mod shutdown;

pub use error::ServerError;
pub use server::Server;
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
