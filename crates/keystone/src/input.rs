//! Raw channel values.
//!
//! Turns the transport's view of a request into the `serde_json::Value`
//! each channel holds before validation.

use bytes::Bytes;
use http::header::COOKIE;
use http::HeaderMap;
use keystone_core::{Issue, Issues};
use keystone_router::Params;
use serde_json::map::Entry;
use serde_json::{Map, Value};

/// The four raw channel values of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInput {
    /// Path parameters as an object of strings.
    pub params: Value,
    /// Parsed body.
    pub body: Value,
    /// Query as an object of strings (arrays for repeated keys).
    pub query: Value,
    /// Cookies as an object of strings.
    pub cookies: Value,
}

impl Default for RawInput {
    fn default() -> Self {
        Self {
            params: Value::Object(Map::new()),
            body: Value::Null,
            query: Value::Object(Map::new()),
            cookies: Value::Object(Map::new()),
        }
    }
}

/// Converts matched path parameters, percent-decoding each value.
///
/// A value that does not decode to UTF-8 is reported under its parameter
/// name.
pub fn params_value(params: Params) -> Result<Value, Issues> {
    let mut map = Map::new();
    let mut issues = Issues::new();
    for (name, raw) in params {
        match urlencoding::decode(&raw) {
            Ok(value) => {
                map.insert(name, Value::String(value.into_owned()));
            }
            Err(_) => issues.push(
                Issue::new(&name, "path parameter is not valid UTF-8 once decoded")
                    .with_code("invalid_encoding"),
            ),
        }
    }

    if issues.is_empty() {
        Ok(Value::Object(map))
    } else {
        Err(issues)
    }
}

/// Parses a request body.
///
/// Empty bodies become `null`; payloads that are not JSON are kept as a
/// string.
#[must_use]
pub fn body_value(body: &Bytes) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Parses a query string. Repeated keys collect into arrays.
///
/// Decoding is lossy: invalid escapes are kept verbatim and invalid UTF-8
/// becomes U+FFFD.
#[must_use]
pub fn query_value(query: Option<&str>) -> Value {
    // String pairs always deserialize; the fallback is never taken.
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query.unwrap_or("")).unwrap_or_default();

    let mut map = Map::new();
    for (key, value) in pairs {
        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Value::String(value));
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(items) => items.push(Value::String(value)),
                single => {
                    let first = single.take();
                    *single = Value::Array(vec![first, Value::String(value)]);
                }
            },
        }
    }
    Value::Object(map)
}

/// Parses every `Cookie` header into one object. Later duplicates win.
#[must_use]
pub fn cookies_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for cookie in header.split(';') {
            if let Some((name, value)) = cookie.trim().split_once('=') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let value = value.trim().trim_matches('"');
                map.insert(name.to_string(), Value::String(value.to_string()));
            }
        }
    }
    Value::Object(map)
}
