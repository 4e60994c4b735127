//! Per-request execution of a matched route.
//!
//! ```text
//! params ─▶ body ─▶ query ─▶ cookies ─▶ context ─▶ middleware ─▶ handler ─▶ response
//!   │        │        │         │                      │            │
//!  404      400      400       400                first error   error/panic
//! ```
//!
//! Every stage converts its own failure into an [`ErrorEnvelope`]; nothing
//! escapes [`dispatch`] untyped.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use keystone_core::logger::log_unexpected;
use keystone_core::{
    json_response, no_content, Channel, ContextValue, ErrorEnvelope, InputChannels,
    PipelineError, RequestContext, RequestHead, Response, ResponseHandle,
};
use serde_json::Value;

use crate::input::RawInput;
use crate::route::RouteEntry;

/// Runs `entry` for one request and always produces a response.
///
/// `internal_message` is the only text callers see for internal failures.
pub async fn dispatch(
    entry: &RouteEntry,
    head: RequestHead,
    input: RawInput,
    internal_message: &str,
) -> Response {
    match execute(entry, head, input).await {
        Ok(response) => {
            tracing::debug!(status = response.status().as_u16(), "request handled");
            response
        }
        Err(err) => failure_response(entry, &err, internal_message),
    }
}

async fn execute(
    entry: &RouteEntry,
    head: RequestHead,
    input: RawInput,
) -> Result<Response, PipelineError> {
    let params = validate(entry, Channel::Params, input.params)?;
    let body = validate(entry, Channel::Body, input.body)?;
    let query = validate(entry, Channel::Query, input.query)?;
    let cookies = validate(entry, Channel::Cookies, input.cookies)?;

    let response = ResponseHandle::new();
    let ctx = RequestContext::new(
        head,
        response.clone(),
        InputChannels {
            params,
            body,
            query,
            cookies,
        },
    );

    let ctx = entry.chain().run(ctx).await?;
    tracing::debug!(keys = ctx.len(), "context assembled");

    let outcome = AssertUnwindSafe(async { entry.handler().call(ctx).await })
        .catch_unwind()
        .await;
    let value = match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => return Err(PipelineError::from_raised(err)),
        Err(panic) => return Err(PipelineError::from_panic(panic)),
    };

    if let Some(written) = response.take_written() {
        return Ok(written);
    }

    let mut reply = if value.is_null() {
        no_content()
    } else {
        json_response(StatusCode::OK, &value).map_err(|e| PipelineError::Unexpected(e.into()))?
    };
    response.apply_headers(&mut reply);
    Ok(reply)
}

fn validate(entry: &RouteEntry, channel: Channel, raw: Value) -> Result<ContextValue, PipelineError> {
    let Some(schema) = entry.validators().get(channel) else {
        return Ok(ContextValue::new(raw));
    };
    tracing::debug!(%channel, "validating channel");
    schema
        .validate_erased(&raw)
        .map_err(|issues| PipelineError::Validation { channel, issues })
}

/// Converts a pipeline failure into its response, logging internal ones.
pub(crate) fn failure_response(
    entry: &RouteEntry,
    err: &PipelineError,
    internal_message: &str,
) -> Response {
    let route = format!("{} {}", entry.method(), entry.path());

    match err {
        PipelineError::Unexpected(source) => {
            log_unexpected(&format!("unexpected error in route {route}"), Some(source));
        }
        PipelineError::Collision { step, source } => {
            let detail = anyhow::Error::new(source.clone())
                .context(format!("middleware '{step}' tried to overwrite a context key"));
            log_unexpected(&format!("context collision in route {route}"), Some(&detail));
        }
        PipelineError::Validation { channel, issues } => {
            tracing::warn!(%route, %channel, issues = issues.len(), "request rejected by schema");
        }
        PipelineError::Domain(domain) => {
            tracing::debug!(%route, name = domain.name(), code = domain.code().as_u16(), "domain error");
        }
    }

    err.to_envelope(internal_message).into_response()
}

/// Builds the envelope for a request that reached no route.
#[must_use]
pub fn not_found() -> Response {
    ErrorEnvelope::from_status(StatusCode::NOT_FOUND)
        .with_message("Route not found")
        .into_response()
}
