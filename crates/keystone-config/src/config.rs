//! The root configuration type.

use std::net::SocketAddr;

use keystone_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ErrorsConfig, ServerConfig};

/// Complete Keystone service configuration.
///
/// Load it with [`ConfigLoader`](crate::ConfigLoader).
///
/// # Example
///
/// ```
/// use keystone_config::KeystoneConfig;
///
/// let config = KeystoneConfig::default();
/// assert_eq!(config.server.addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct KeystoneConfig {
    /// Transport settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LogConfig,

    /// Error reporting.
    #[serde(default)]
    pub errors: ErrorsConfig,
}

impl KeystoneConfig {
    /// Checks values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if let Err(e) = self.logging.validate() {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        if self.errors.internal_message.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "errors.internal_message",
                "must not be empty",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Parses `server.addr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.addr.parse().map_err(|_| {
            ConfigError::invalid_value(
                "server.addr",
                format!("invalid socket address: {}", self.server.addr),
            )
        })
    }

    /// Local development preset: loopback address, pretty debug logs.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.addr = "127.0.0.1:8080".to_string();
        config.logging = LogConfig::development();
        config
    }

    /// Production preset: JSON logs at `info`.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging = LogConfig::production();
        config.logging.format = LogFormat::Json;
        config
    }
}
