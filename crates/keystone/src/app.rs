//! The live route table.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW};
use http::StatusCode;
use http_body_util::Full;
use keystone_core::{Channel, ErrorEnvelope, PipelineError, RequestHead, Response, DEFAULT_INTERNAL_MESSAGE};
use keystone_router::{Lookup, RouteError, Router};
use tracing::Instrument;

use crate::collection::RouteCollection;
use crate::dispatch::{dispatch, failure_response, not_found};
use crate::input::{body_value, cookies_value, params_value, query_value, RawInput};
use crate::route::RouteEntry;

struct Inner {
    router: Router<Arc<RouteEntry>>,
    internal_message: String,
}

/// A compiled [`RouteCollection`] that answers HTTP requests.
///
/// Compilation happens once in [`App::new`]; clones share the table.
///
/// # Example
///
/// ```
/// use keystone::prelude::*;
/// use bytes::Bytes;
///
/// # tokio_test::block_on(async {
/// let routes = RouteCollection::new()
///     .route(Route::get("/ping").handle(|_ctx: RequestContext| async {
///         Ok::<_, DomainError>("pong")
///     }))
///     .unwrap();
/// let app = App::new(&routes).unwrap();
///
/// let request = http::Request::get("/ping").body(Bytes::new()).unwrap();
/// let response = app.handle(request).await;
/// assert_eq!(response.status(), 200);
/// # });
/// ```
#[derive(Clone)]
pub struct App {
    inner: Arc<Inner>,
}

impl App {
    /// Compiles `routes` into a router.
    ///
    /// Fails if two routes name the same parameter position differently.
    pub fn new(routes: &RouteCollection) -> Result<Self, RouteError> {
        let mut router = Router::new();
        for entry in routes.iter() {
            router.insert(entry.method(), entry.path(), entry.clone())?;
            tracing::debug!(method = %entry.method(), path = entry.path(), "route registered");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                router,
                internal_message: DEFAULT_INTERNAL_MESSAGE.to_string(),
            }),
        })
    }

    /// Replaces the message sent to callers for internal failures.
    #[must_use]
    pub fn with_internal_error_message(self, message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                router: self.inner.router.clone(),
                internal_message: message.into(),
            }),
        }
    }

    /// Returns the number of compiled routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.router.len()
    }

    /// Handles one request.
    ///
    /// Responses to `HEAD` requests keep their status and headers but carry
    /// no body.
    pub async fn handle(&self, request: http::Request<Bytes>) -> Response {
        let (parts, body) = request.into_parts();
        let span = tracing::info_span!("request", method = %parts.method, path = %parts.uri.path());
        let is_head = parts.method == http::Method::HEAD;

        let response = async move {
            let (entry, params) = match self.inner.router.lookup(&parts.method, parts.uri.path()) {
                Lookup::Found { value, params } => (value.clone(), params),
                Lookup::MethodNotAllowed { allowed } => {
                    tracing::debug!("method not allowed");
                    return method_not_allowed(&allowed);
                }
                Lookup::NotFound => {
                    tracing::debug!("no route matched");
                    return not_found();
                }
            };

            let params = match params_value(params) {
                Ok(params) => params,
                Err(issues) => {
                    let err = PipelineError::Validation {
                        channel: Channel::Params,
                        issues,
                    };
                    return failure_response(&entry, &err, &self.inner.internal_message);
                }
            };

            let input = RawInput {
                params,
                body: body_value(&body),
                query: query_value(parts.uri.query()),
                cookies: cookies_value(&parts.headers),
            };
            let head = RequestHead::new(parts.method, parts.uri, parts.headers);

            dispatch(&entry, head, input, &self.inner.internal_message).await
        }
        .instrument(span)
        .await;

        if is_head {
            let (parts, _) = response.into_parts();
            return Response::from_parts(parts, Full::default());
        }
        response
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.route_count())
            .finish_non_exhaustive()
    }
}

fn method_not_allowed(allowed: &[http::Method]) -> Response {
    let allow = allowed
        .iter()
        .map(http::Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut response = ErrorEnvelope::from_status(StatusCode::METHOD_NOT_ALLOWED)
        .with_message("Method not allowed")
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}
