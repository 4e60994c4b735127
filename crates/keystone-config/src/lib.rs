//! Typed configuration for Keystone services.
//!
//! - TOML and JSON files, merged field by field over defaults
//! - `PREFIX__SECTION__KEY` environment overrides, optionally from `.env`
//! - Strict parsing: unknown sections and fields are errors
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:8080"
//! request_timeout_ms = 30000   # 0 disables the timeout
//! shutdown_timeout_secs = 30
//! max_body_bytes = 2097152
//!
//! [logging]
//! level = "info"               # or directives: "keystone=debug,hyper=warn"
//! format = "json"              # json | pretty | compact
//! target = "stdout"            # stdout | stderr
//!
//! [errors]
//! internal_message = "Internal server error"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use keystone_config::ConfigLoader;
//!
//! # fn main() -> Result<(), keystone_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("keystone.toml")?
//!     .with_env_prefix("KEYSTONE")
//!     .load()?;
//!
//! println!("listening on {}", config.server.addr);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::KeystoneConfig;
pub use error::ConfigError;
pub use keystone_telemetry::{LogConfig, LogFormat, LogTarget};
pub use loader::ConfigLoader;
pub use schema::{ErrorsConfig, ServerConfig};
