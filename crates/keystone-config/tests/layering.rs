//! File and environment layering against the real filesystem and process
//! environment.

use std::io::Write;

use keystone_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::{Builder, NamedTempFile};

fn file_with(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_file_then_json_file() {
    let toml = file_with(
        ".toml",
        r#"
        [server]
        addr = "127.0.0.1:4000"
        request_timeout_ms = 1500

        [logging]
        format = "pretty"
        "#,
    );
    let json = file_with(".json", r#"{"server": {"request_timeout_ms": 2500}}"#);

    let config = ConfigLoader::new()
        .with_file(toml.path())
        .unwrap()
        .with_file(json.path())
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.server.addr, "127.0.0.1:4000");
    assert_eq!(config.server.request_timeout_ms, 2500);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_malformed_toml_file() {
    let file = file_with(".toml", "[server\naddr = ");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::TomlError(_)));
}

#[test]
fn test_unknown_extension() {
    let file = file_with(".ini", "addr=1");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
}

#[test]
fn test_env_overrides_file() {
    let file = file_with(".toml", "[server]\naddr = \"127.0.0.1:4000\"\n[errors]\ninternal_message = \"from file\"");
    std::env::set_var("KSCFGTEST__SERVER__ADDR", "127.0.0.1:5000");
    std::env::set_var("KSCFGTEST__LOGGING__LEVEL", "debug");

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .with_env_prefix("kscfgtest")
        .load()
        .unwrap();

    std::env::remove_var("KSCFGTEST__SERVER__ADDR");
    std::env::remove_var("KSCFGTEST__LOGGING__LEVEL");

    assert_eq!(config.server.addr, "127.0.0.1:5000");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.errors.internal_message, "from file");
}

#[test]
fn test_invalid_env_value_fails() {
    std::env::set_var("KSBADTEST__SERVER__REQUEST_TIMEOUT_MS", "soon");
    let result = ConfigLoader::new().with_env_prefix("KSBADTEST").load();
    std::env::remove_var("KSBADTEST__SERVER__REQUEST_TIMEOUT_MS");

    assert!(matches!(result, Err(ConfigError::EnvParseError { var, .. }) if var == "KSBADTEST__SERVER__REQUEST_TIMEOUT_MS"));
}

#[test]
fn test_dotenv_file_feeds_env_overrides() {
    let dotenv = file_with(".env", "KSDOTENVTEST__ERRORS__INTERNAL_MESSAGE=\"Try again later\"\n");

    let config = ConfigLoader::new()
        .with_dotenv_file(dotenv.path())
        .unwrap()
        .with_env_prefix("KSDOTENVTEST")
        .load()
        .unwrap();

    assert_eq!(config.errors.internal_message, "Try again later");
}
