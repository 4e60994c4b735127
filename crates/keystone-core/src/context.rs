//! Request context types.
//!
//! The [`RequestContext`] carries all per-request state through the
//! middleware chain and into handlers. It starts with the reserved keys
//! (see [`keys`]) and only grows through [`RequestContext::merge`], which
//! refuses to overwrite anything already present.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, Method, Uri};
use indexmap::IndexMap;
use thiserror::Error;

use crate::error::Channel;
use crate::response::ResponseHandle;

/// Reserved context keys.
pub mod keys {
    /// Request head ([`RequestHead`](crate::RequestHead)).
    pub const REQUEST: &str = "req";
    /// Response handle ([`ResponseHandle`](crate::ResponseHandle)).
    pub const RESPONSE: &str = "res";
    /// Request body channel.
    pub const BODY: &str = "body";
    /// Query channel.
    pub const QUERY: &str = "query";
    /// Path parameter channel.
    pub const PARAMS: &str = "params";
    /// Cookie channel.
    pub const COOKIES: &str = "cookies";
}

/// A type-erased, cheaply clonable context value.
#[derive(Clone)]
pub struct ContextValue(Arc<dyn Any + Send + Sync>);

impl ContextValue {
    /// Wraps a value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns the value if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns `true` if the value has type `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContextValue(..)")
    }
}

/// Method, URI and headers of the inbound request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl RequestHead {
    /// Creates a request head.
    #[must_use]
    pub const fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A context key that is already present.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tried to add context key '{key}', which is already present")]
pub struct ContextCollision {
    /// The rejected key.
    pub key: String,
}

/// A key required by a handler or middleware is missing or has another type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("context key '{key}' is missing or is not a {expected}")]
pub struct MissingContextKey {
    /// The requested key.
    pub key: String,
    /// The requested type name.
    pub expected: &'static str,
}

/// Named values contributed by one middleware step.
///
/// # Example
///
/// ```
/// use keystone_core::Additions;
///
/// let additions = Additions::new()
///     .with("user_id", 42_u64)
///     .with("role", String::from("admin"));
/// assert_eq!(additions.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Additions {
    entries: Vec<(String, ContextValue)>,
}

impl Additions {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named value.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a named value in place.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.entries.push((key.into(), ContextValue::new(value)));
    }

    /// Adds an already erased value.
    pub fn insert_value(&mut self, key: impl Into<String>, value: ContextValue) {
        self.entries.push((key.into(), value));
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// The four input channels as they enter the context.
///
/// Each value is either the raw `serde_json::Value` or, for a channel with a
/// declared schema, the schema's typed output.
#[derive(Debug, Clone)]
pub struct InputChannels {
    /// Path parameters.
    pub params: ContextValue,
    /// Body.
    pub body: ContextValue,
    /// Query.
    pub query: ContextValue,
    /// Cookies.
    pub cookies: ContextValue,
}

/// Per-request context passed through the middleware chain into the handler.
///
/// # Example
///
/// ```
/// use keystone_core::{Additions, InputChannels, RequestContext, RequestHead, ResponseHandle};
/// use keystone_core::ContextValue;
/// use serde_json::{json, Value};
///
/// let head = RequestHead::new(http::Method::GET, "/users/7".parse().unwrap(), Default::default());
/// let channels = InputChannels {
///     params: ContextValue::new(json!({"id": "7"})),
///     body: ContextValue::new(Value::Null),
///     query: ContextValue::new(json!({})),
///     cookies: ContextValue::new(json!({})),
/// };
/// let ctx = RequestContext::new(head, ResponseHandle::new(), channels);
///
/// let ctx = ctx.merge(Additions::new().with("user", "ada")).unwrap();
/// assert_eq!(ctx.get::<&str>("user"), Some(&"ada"));
/// assert!(ctx.merge(Additions::new().with("params", 1)).is_err());
/// ```
#[derive(Clone)]
pub struct RequestContext {
    head: Arc<RequestHead>,
    response: ResponseHandle,
    entries: IndexMap<String, ContextValue>,
}

impl RequestContext {
    /// Assembles the initial context with every reserved key.
    #[must_use]
    pub fn new(head: RequestHead, response: ResponseHandle, channels: InputChannels) -> Self {
        let head = Arc::new(head);
        let mut entries = IndexMap::with_capacity(8);
        entries.insert(keys::REQUEST.to_string(), ContextValue(head.clone()));
        entries.insert(
            keys::RESPONSE.to_string(),
            ContextValue::new(response.clone()),
        );
        entries.insert(keys::BODY.to_string(), channels.body);
        entries.insert(keys::QUERY.to_string(), channels.query);
        entries.insert(keys::PARAMS.to_string(), channels.params);
        entries.insert(keys::COOKIES.to_string(), channels.cookies);

        Self {
            head,
            response,
            entries,
        }
    }

    /// Returns a new context with `additions` applied.
    ///
    /// Fails without applying anything if any added key is already present
    /// or appears twice in `additions`.
    pub fn merge(mut self, additions: Additions) -> Result<Self, ContextCollision> {
        for (i, (key, _)) in additions.entries.iter().enumerate() {
            let repeated = additions.entries[..i].iter().any(|(k, _)| k == key);
            if repeated || self.entries.contains_key(key) {
                return Err(ContextCollision { key: key.clone() });
            }
        }

        self.entries.extend(additions.entries);
        Ok(self)
    }

    /// Returns the value at `key` if it has type `T`.
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(ContextValue::downcast_ref)
    }

    /// Like [`get`](Self::get), but as an error for use with `?`.
    pub fn require<T: 'static>(&self, key: &str) -> Result<&T, MissingContextKey> {
        self.get(key).ok_or_else(|| MissingContextKey {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Returns the erased value at `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: the reserved keys are present from the start.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the request head.
    #[must_use]
    pub fn request(&self) -> &RequestHead {
        &self.head
    }

    /// Returns the response handle.
    #[must_use]
    pub const fn response(&self) -> &ResponseHandle {
        &self.response
    }

    /// Returns a channel value as `T`.
    #[must_use]
    pub fn channel<T: 'static>(&self, channel: Channel) -> Option<&T> {
        self.get(channel.as_str())
    }

    /// Returns the body as `T`.
    #[must_use]
    pub fn body<T: 'static>(&self) -> Option<&T> {
        self.channel(Channel::Body)
    }

    /// Returns the query as `T`.
    #[must_use]
    pub fn query<T: 'static>(&self) -> Option<&T> {
        self.channel(Channel::Query)
    }

    /// Returns the path parameters as `T`.
    #[must_use]
    pub fn params<T: 'static>(&self) -> Option<&T> {
        self.channel(Channel::Params)
    }

    /// Returns the cookies as `T`.
    #[must_use]
    pub fn cookies<T: 'static>(&self) -> Option<&T> {
        self.channel(Channel::Cookies)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", self.head.method())
            .field("path", &self.head.path())
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn context() -> RequestContext {
        let head = RequestHead::new(
            Method::POST,
            "/users?page=2".parse().unwrap(),
            HeaderMap::new(),
        );
        RequestContext::new(
            head,
            ResponseHandle::new(),
            InputChannels {
                params: ContextValue::new(json!({})),
                body: ContextValue::new(json!({"name": "Ada"})),
                query: ContextValue::new(json!({"page": "2"})),
                cookies: ContextValue::new(json!({})),
            },
        )
    }

    #[test]
    fn test_reserved_keys_present() {
        let ctx = context();
        let keys: Vec<_> = ctx.keys().collect();
        assert_eq!(keys, ["req", "res", "body", "query", "params", "cookies"]);
        assert_eq!(ctx.request().path(), "/users");
        assert!(ctx.get::<ResponseHandle>(keys::RESPONSE).is_some());
        assert_eq!(ctx.query::<Value>().unwrap()["page"], "2");
    }

    #[test]
    fn test_merge_adds_keys() {
        let ctx = context()
            .merge(Additions::new().with("user", 7_u64))
            .unwrap()
            .merge(Additions::new().with("role", "admin".to_string()))
            .unwrap();

        assert_eq!(ctx.get::<u64>("user"), Some(&7));
        assert_eq!(ctx.require::<String>("role").unwrap(), "admin");
        assert_eq!(ctx.len(), 8);
    }

    #[test]
    fn test_merge_rejects_reserved_key() {
        let err = context()
            .merge(Additions::new().with("body", 1))
            .unwrap_err();
        assert_eq!(err.key, "body");
    }

    #[test]
    fn test_merge_rejects_earlier_addition() {
        let ctx = context().merge(Additions::new().with("user", 1)).unwrap();
        let err = ctx.merge(Additions::new().with("user", 2)).unwrap_err();
        assert_eq!(err.key, "user");
    }

    #[test]
    fn test_merge_is_atomic() {
        let ctx = context();
        let before = ctx.len();
        let result = ctx
            .clone()
            .merge(Additions::new().with("fresh", 1).with("query", 2));
        assert!(result.is_err());
        assert_eq!(ctx.len(), before);
        assert!(!ctx.contains_key("fresh"));
    }

    #[test]
    fn test_merge_rejects_repeated_key_in_one_set() {
        let err = context()
            .merge(Additions::new().with("a", 1).with("a", 2))
            .unwrap_err();
        assert_eq!(err.key, "a");
    }

    #[test]
    fn test_get_with_wrong_type() {
        let ctx = context().merge(Additions::new().with("n", 1_u32)).unwrap();
        assert!(ctx.get::<String>("n").is_none());
        let err = ctx.require::<String>("n").unwrap_err();
        assert_eq!(err.key, "n");
    }

    #[test]
    fn test_empty_additions_is_noop() {
        let ctx = context();
        let merged = ctx.clone().merge(Additions::new()).unwrap();
        assert_eq!(merged.len(), ctx.len());
    }

    mod merge_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn merge_never_replaces_an_existing_key(
                first in proptest::collection::vec("[a-e]{1,2}", 0..6),
                second in proptest::collection::vec("[a-e]{1,2}", 0..6),
            ) {
                let additions = first.iter().fold(Additions::new(), |acc, k| acc.with(k.clone(), 1_u8));
                let Ok(ctx) = context().merge(additions) else {
                    return Ok(());
                };
                let before: Vec<String> = ctx.keys().map(str::to_string).collect();

                let clashes = second.iter().enumerate().any(|(i, k)| {
                    before.contains(k) || second[..i].contains(k)
                });
                let additions = second.iter().fold(Additions::new(), |acc, k| acc.with(k.clone(), 2_u8));

                match ctx.clone().merge(additions) {
                    Ok(merged) => {
                        prop_assert!(!clashes);
                        prop_assert_eq!(merged.len(), before.len() + second.len());
                        for key in &before {
                            prop_assert_eq!(
                                merged.get::<u8>(key).copied(),
                                ctx.get::<u8>(key).copied()
                            );
                        }
                    }
                    Err(collision) => {
                        prop_assert!(clashes);
                        prop_assert!(second.contains(&collision.key));
                    }
                }
            }
        }
    }
}
