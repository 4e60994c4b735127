//! Route table errors.

use thiserror::Error;

use crate::method::Method;

/// Errors raised while declaring or compiling routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Two routes share a method and an effective path.
    #[error("duplicate route: {method} {path}")]
    Duplicate {
        /// The method.
        method: Method,
        /// The path as declared by the second route.
        path: String,
    },

    /// Two routes name the same path parameter position differently.
    #[error("route {path} names parameter ':{new}' where ':{existing}' is already registered")]
    ParamConflict {
        /// The path being inserted.
        path: String,
        /// The name already in the tree.
        existing: String,
        /// The conflicting name.
        new: String,
    },

    /// A catch-all segment is followed by more segments.
    #[error("catch-all segment must be last in route {0}")]
    WildcardNotLast(String),

    /// A parameter segment has no name.
    #[error("unnamed parameter in route {0}")]
    UnnamedParam(String),

    /// A method name outside the supported set.
    #[error("unsupported method '{0}'")]
    UnknownMethod(String),
}
