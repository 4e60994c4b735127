//! In-memory client for a compiled [`App`].

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;
use http::{HeaderName, HeaderValue, Method};
use keystone::App;
use serde::Serialize;

/// Sends requests straight into an [`App`] without binding a socket.
///
/// # Example
///
/// ```
/// use keystone::prelude::*;
/// use keystone_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let routes = RouteCollection::new()
///     .route(Route::get("/ping").handle(|_ctx: RequestContext| async {
///         Ok::<_, DomainError>("pong")
///     }))
///     .unwrap();
/// let client = TestClient::new(App::new(&routes).unwrap());
///
/// let response = client.get("/ping").send().await;
/// response.assert_status(200);
/// assert_eq!(response.json_value().unwrap(), "pong");
/// # });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    app: App,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `app`.
    pub fn new(app: App) -> Self {
        Self {
            app,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the application under test.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PUT request builder.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Creates a PATCH request builder.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates an OPTIONS request builder.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Creates a HEAD request builder.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Creates a request builder for any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest {
            client: self,
            builder: TestRequestBuilder::new(method, uri),
        }
    }

    /// Dispatches a built request.
    pub async fn execute(&self, mut request: TestRequest) -> Result<TestResponse, TestError> {
        for (name, value) in &self.default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| TestError::InvalidHeader(e.to_string()))?;
            if request.headers.contains_key(&name) {
                continue;
            }
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| TestError::InvalidHeader(e.to_string()))?;
            request.headers.insert(name, value);
        }

        let response = self.app.handle(request.into_http_request()).await;
        TestResponse::from_http(response).await
    }
}

/// A request being built against a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Adds a cookie.
    pub fn cookie(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.cookie(name, value);
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Appends a serialized query string.
    pub fn query<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.query(value);
        self
    }

    /// Sends the request, panicking if it could not be built.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone::prelude::*;
    use serde_json::{json, Value};

    fn echo_app() -> App {
        let routes = RouteCollection::new()
            .route(Route::all("/echo/*rest").handle(|ctx: RequestContext| async move {
                let head = ctx.request();
                Ok::<_, DomainError>(json!({
                    "method": head.method().as_str(),
                    "path": head.path(),
                    "custom": head.header("x-custom"),
                    "query": ctx.query::<Value>().cloned(),
                    "cookies": ctx.cookies::<Value>().cloned(),
                    "body": ctx.body::<Value>().cloned(),
                }))
            }))
            .unwrap();
        App::new(&routes).unwrap()
    }

    #[tokio::test]
    async fn test_all_methods_reach_the_app() {
        let client = TestClient::new(echo_app());

        for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS] {
            let response = client.request(method.clone(), "/echo/x").send().await;
            response.assert_json_field("method", &json!(method.as_str()));
        }
    }

    #[tokio::test]
    async fn test_default_header_does_not_override() {
        let client = TestClient::new(echo_app()).with_default_header("x-custom", "default");

        let response = client.get("/echo/a").send().await;
        response.assert_json_field("custom", &json!("default"));

        let response = client.get("/echo/a").header("x-custom", "mine").send().await;
        response.assert_json_field("custom", &json!("mine"));
    }

    #[tokio::test]
    async fn test_body_query_and_cookies() {
        let client = TestClient::new(echo_app());

        let response = client
            .post("/echo/items")
            .query(&[("page", "2")])
            .cookie("session", "abc")
            .json(&json!({"name": "Alice"}))
            .send()
            .await;

        response
            .assert_status(200)
            .assert_json_field("path", &json!("/echo/items"))
            .assert_json_field("query.page", &json!("2"))
            .assert_json_field("cookies.session", &json!("abc"))
            .assert_json_field("body.name", &json!("Alice"));
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let client = TestClient::new(echo_app());
        let err = client.get("/echo/a").header("bad header", "x").try_send().await.unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }
}
