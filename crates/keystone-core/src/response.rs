//! Response types.
//!
//! Handlers normally return a serializable value. When they need full
//! control over the status, headers or body, they write through the
//! [`ResponseHandle`] stored under the `res` context key instead; a written
//! response takes precedence over the handler's return value.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use serde::Serialize;

/// The HTTP response type produced by Keystone.
pub type Response = http::Response<Full<Bytes>>;

/// Builds a response with a body and an optional content type.
#[must_use]
pub fn build_response(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> Response {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

/// Serializes `value` into a JSON response.
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> Result<Response, serde_json::Error> {
    let body = serde_json::to_vec(value)?;
    Ok(build_response(
        status,
        Some("application/json"),
        Bytes::from(body),
    ))
}

/// Builds an empty `204 No Content` response.
#[must_use]
pub fn no_content() -> Response {
    build_response(StatusCode::NO_CONTENT, None, Bytes::new())
}

#[derive(Debug, Default)]
struct Written {
    body: Option<(StatusCode, Option<&'static str>, Bytes)>,
    headers: HeaderMap,
}

/// Shared, writable response slot for one request.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct ResponseHandle {
    inner: Arc<Mutex<Written>>,
}

impl ResponseHandle {
    /// Creates an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a raw body. The last write wins.
    pub fn send(&self, status: StatusCode, body: impl Into<Bytes>) {
        self.inner.lock().body = Some((status, None, body.into()));
    }

    /// Writes a plain-text body.
    pub fn text(&self, status: StatusCode, body: impl Into<String>) {
        let body = Bytes::from(body.into());
        self.inner.lock().body = Some((status, Some("text/plain; charset=utf-8"), body));
    }

    /// Writes a JSON body.
    pub fn json<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let body = Bytes::from(serde_json::to_vec(value)?);
        self.inner.lock().body = Some((status, Some("application/json"), body));
        Ok(())
    }

    /// Stages a header for the final successful response.
    pub fn header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.lock().headers.insert(name, value);
    }

    /// Returns `true` once a body has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.inner.lock().body.is_some()
    }

    /// Takes the written response, if any, with staged headers applied.
    #[must_use]
    pub fn take_written(&self) -> Option<Response> {
        let mut inner = self.inner.lock();
        let (status, content_type, body) = inner.body.take()?;
        let mut response = build_response(status, content_type, body);
        response.headers_mut().extend(inner.headers.drain());
        Some(response)
    }

    /// Applies staged headers to a response built elsewhere.
    pub fn apply_headers(&self, response: &mut Response) {
        let mut inner = self.inner.lock();
        response.headers_mut().extend(inner.headers.drain());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = json_response(StatusCode::OK, &serde_json::json!({"ok": true})).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, Bytes::from_static(br#"{"ok":true}"#));
    }

    #[tokio::test]
    async fn test_written_response_last_write_wins() {
        let handle = ResponseHandle::new();
        assert!(!handle.is_written());

        handle.text(StatusCode::ACCEPTED, "first");
        handle.clone().send(StatusCode::CREATED, "second");
        assert!(handle.is_written());

        let response = handle.take_written().unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_of(response).await, Bytes::from_static(b"second"));
        assert!(handle.take_written().is_none());
    }

    #[test]
    fn test_staged_headers() {
        let handle = ResponseHandle::new();
        handle.header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc"),
        );

        let mut response = no_content();
        handle.apply_headers(&mut response);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "abc");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
