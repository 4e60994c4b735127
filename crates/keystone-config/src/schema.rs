//! Configuration section types.

use std::time::Duration;

use keystone_core::DEFAULT_INTERNAL_MESSAGE;
use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// # Example
///
/// ```
/// use keystone_config::ServerConfig;
///
/// let config = ServerConfig {
///     addr: "127.0.0.1:3000".to_string(),
///     request_timeout_ms: 0,
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout(), None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Per-request timeout in milliseconds. `0` disables it.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// The request timeout, if enabled.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// The graceful shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            request_timeout_ms: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Error reporting section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Message sent to callers for every internal failure.
    #[serde(default = "default_internal_message")]
    pub internal_message: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            internal_message: default_internal_message(),
        }
    }
}

fn default_internal_message() -> String {
    DEFAULT_INTERNAL_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "0.0.0.0:8080");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_server_config_partial() {
        let config: ServerConfig = toml::from_str(r#"addr = "127.0.0.1:9000""#).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_server_config_rejects_unknown_field() {
        let result = toml::from_str::<ServerConfig>("http2 = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_errors_config_default() {
        assert_eq!(ErrorsConfig::default().internal_message, "Internal server error");
    }
}
