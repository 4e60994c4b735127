//! Logging setup for Keystone services.
//!
//! Dispatch emits `tracing` events and spans: one `request` span per
//! request, `debug` events per pipeline stage, `warn` for rejected input,
//! and `error` from the default error logger. This crate installs the
//! subscriber that renders them.
//!
//! ```text
//! LogConfig ─▶ EnvFilter (RUST_LOG overrides level)
//!          └─▶ fmt layer (json | pretty | compact) ─▶ stdout | stderr
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat, LogTarget};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
