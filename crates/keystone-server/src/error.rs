//! Server error types.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that stop a server from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address does not parse.
    #[error("invalid bind address: {0}")]
    InvalidAddress(String),

    /// The listener could not be bound.
    #[error("failed to bind to {addr}")]
    Bind {
        /// The requested address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Other I/O failure on the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
