//! Process-wide sink for unexpected errors.
//!
//! Unexpected handler and middleware failures, panics and context
//! collisions are reported here before the generic 500 is sent. The default
//! sink emits a `tracing` error event; applications may install their own
//! once at startup.

use std::sync::Arc;

use parking_lot::RwLock;

/// Signature of an error sink.
pub type ErrorLogFn = dyn Fn(&str, Option<&anyhow::Error>) + Send + Sync + 'static;

static ERROR_LOGGER: RwLock<Option<Arc<ErrorLogFn>>> = parking_lot::const_rwlock(None);

/// Replaces the process-wide error sink.
///
/// # Example
///
/// ```
/// use keystone_core::logger::{log_unexpected, reset_error_logger, set_error_logger};
///
/// set_error_logger(|message, _err| eprintln!("[keystone] {message}"));
/// log_unexpected("handler failed", None);
/// reset_error_logger();
/// ```
pub fn set_error_logger<F>(logger: F)
where
    F: Fn(&str, Option<&anyhow::Error>) + Send + Sync + 'static,
{
    *ERROR_LOGGER.write() = Some(Arc::new(logger));
}

/// Restores the default `tracing` sink.
pub fn reset_error_logger() {
    *ERROR_LOGGER.write() = None;
}

/// Reports an unexpected error to the current sink.
pub fn log_unexpected(message: &str, error: Option<&anyhow::Error>) {
    // Clone out so a sink may itself replace the logger.
    let logger = ERROR_LOGGER.read().clone();
    match logger {
        Some(logger) => logger(message, error),
        None => default_error_logger(message, error),
    }
}

/// The default sink.
pub fn default_error_logger(message: &str, error: Option<&anyhow::Error>) {
    match error {
        Some(err) => tracing::error!(error = %format!("{err:#}"), "{message}"),
        None => tracing::error!("{message}"),
    }
}
