//! # Keystone Core
//!
//! Core types shared by every Keystone crate:
//!
//! - [`Schema`] - Validator capability for request channels, with adapters
//! - [`RequestContext`] - Per-request, append-only context
//! - [`Additions`] - Values contributed by a middleware step
//! - [`DomainError`] / [`ErrorEnvelope`] / [`PipelineError`] - Error taxonomy and wire format
//! - [`ResponseHandle`] - Writable response slot for handlers
//! - [`logger`] - Process-wide sink for unexpected errors

#![doc(html_root_url = "https://docs.rs/keystone-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
pub mod logger;
mod response;
pub mod schema;

pub use context::{
    keys, Additions, ContextCollision, ContextValue, InputChannels, MissingContextKey,
    RequestContext, RequestHead,
};
pub use error::{
    default_error_name, Channel, DomainError, ErrorEnvelope, KeystoneResult, PipelineError,
    DEFAULT_INTERNAL_MESSAGE,
};
pub use response::{build_response, json_response, no_content, Response, ResponseHandle};
pub use schema::{BoxedSchema, ErasedSchema, FieldType, FnSchema, Issue, Issues, ObjectSchema, Schema, Typed};

#[cfg(feature = "json-schema")]
pub use schema::JsonSchema;

/// Boxed, `Send` future used by middleware and handlers.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
