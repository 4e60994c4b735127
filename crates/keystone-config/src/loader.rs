//! Layered configuration loading.
//!
//! Layers are applied in call order and merged field by field, so a file
//! that only sets `server.addr` keeps every other value from the layers
//! below it. Environment overrides are applied last, then the result is
//! validated.

use std::env;
use std::fs;
use std::path::Path;

use keystone_telemetry::{LogFormat, LogTarget};
use serde_json::{Map, Value};

use crate::{ConfigError, KeystoneConfig};

/// Builds a [`KeystoneConfig`] from defaults, files, strings and the
/// environment.
///
/// # Example
///
/// ```no_run
/// use keystone_config::ConfigLoader;
///
/// # fn main() -> Result<(), keystone_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_optional_file("keystone.toml")?
///     .with_env_prefix("KEYSTONE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    base: KeystoneConfig,
    overlay: Map<String, Value>,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Starts from [`KeystoneConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::from_base(KeystoneConfig::default())
    }

    fn from_base(base: KeystoneConfig) -> Self {
        Self {
            base,
            overlay: Map::new(),
            env_prefix: None,
        }
    }

    /// Starts from [`KeystoneConfig::development`], discarding earlier layers.
    ///
    /// ```
    /// use keystone_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(self) -> Self {
        Self {
            env_prefix: self.env_prefix,
            ..Self::from_base(KeystoneConfig::development())
        }
    }

    /// Starts from [`KeystoneConfig::production`], discarding earlier layers.
    #[must_use]
    pub fn with_production(self) -> Self {
        Self {
            env_prefix: self.env_prefix,
            ..Self::from_base(KeystoneConfig::production())
        }
    }

    /// Merges a TOML or JSON file, chosen by extension.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.with_string(&content, format)
    }

    /// Merges a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration text in `format` (`"toml"` or `"json"`).
    ///
    /// ```
    /// use keystone_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\naddr = \"127.0.0.1:3000\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.addr, "127.0.0.1:3000");
    /// assert_eq!(config.server.request_timeout_ms, 30_000);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => serde_json::to_value(toml::from_str::<toml::Table>(content)?)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        match layer {
            Value::Object(map) => {
                merge(&mut self.overlay, map);
                Ok(self)
            }
            _ => Err(ConfigError::invalid_value("<root>", "expected a table of sections")),
        }
    }

    /// Enables `PREFIX__SECTION__KEY` environment overrides.
    ///
    /// Recognised keys:
    /// `SERVER__ADDR`, `SERVER__REQUEST_TIMEOUT_MS`, `SERVER__SHUTDOWN_TIMEOUT_SECS`,
    /// `SERVER__MAX_BODY_BYTES`, `LOGGING__ENABLED`, `LOGGING__LEVEL`,
    /// `LOGGING__FORMAT`, `LOGGING__TARGET`, `ERRORS__INTERNAL_MESSAGE`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the working directory into the process
    /// environment, if present.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads a specific dotenv file. Variables already set are kept.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Merges all layers, applies environment overrides and validates.
    pub fn load(self) -> Result<KeystoneConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) without the final validation.
    pub fn load_unvalidated(self) -> Result<KeystoneConfig, ConfigError> {
        let mut merged = match serde_json::to_value(&self.base)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merge(&mut merged, self.overlay);

        let mut config: KeystoneConfig = serde_json::from_value(Value::Object(merged))?;

        if let Some(prefix) = &self.env_prefix {
            let marker = format!("{prefix}__");
            for (key, value) in env::vars().filter(|(k, _)| k.starts_with(&marker)) {
                apply_env_var(&mut config, &key, &value, prefix)?;
            }
        }

        Ok(config)
    }
}

/// Deep-merges `layer` into `target`. Tables merge; anything else replaces.
fn merge(target: &mut Map<String, Value>, layer: Map<String, Value>) {
    for (key, value) in layer {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn apply_env_var(
    config: &mut KeystoneConfig,
    key: &str,
    value: &str,
    prefix: &str,
) -> Result<(), ConfigError> {
    let path = key
        .strip_prefix(prefix)
        .and_then(|k| k.strip_prefix("__"))
        .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

    let parts: Vec<&str> = path.split("__").collect();

    match parts.as_slice() {
        ["SERVER", "ADDR"] => config.server.addr = value.to_string(),
        ["SERVER", "REQUEST_TIMEOUT_MS"] => {
            config.server.request_timeout_ms = parse_number(key, value)?;
        }
        ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
            config.server.shutdown_timeout_secs = parse_number(key, value)?;
        }
        ["SERVER", "MAX_BODY_BYTES"] => {
            config.server.max_body_bytes = parse_number(key, value)?;
        }
        ["LOGGING", "ENABLED"] => {
            config.logging.enabled = parse_bool(value)
                .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
        }
        ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
        ["LOGGING", "FORMAT"] => {
            config.logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                _ => {
                    return Err(ConfigError::env_parse_error(
                        key,
                        "expected 'json', 'pretty' or 'compact'",
                    ))
                }
            };
        }
        ["LOGGING", "TARGET"] => {
            config.logging.target = match value.to_lowercase().as_str() {
                "stdout" => LogTarget::Stdout,
                "stderr" => LogTarget::Stderr,
                _ => return Err(ConfigError::env_parse_error(key, "expected 'stdout' or 'stderr'")),
            };
        }
        ["ERRORS", "INTERNAL_MESSAGE"] => config.errors.internal_message = value.to_string(),
        // Unknown keys are ignored so unrelated variables sharing the prefix are harmless.
        _ => {}
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
