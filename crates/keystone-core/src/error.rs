//! Error types for Keystone.
//!
//! Every failure in the request pipeline ends up as an [`ErrorEnvelope`], the
//! single wire format sent to callers:
//!
//! ```json
//! { "name": "NOT_FOUND", "code": 404, "message": "User not found", "cause": [] }
//! ```
//!
//! `message` and `cause` are omitted when absent. The HTTP status of the
//! response always equals `code`.
//!
//! # Error taxonomy
//!
//! | Variant | Origin | Status | Logged |
//! |---|---|---|---|
//! | [`PipelineError::Validation`] | schema rejected a channel | 404 (params) / 400 | no |
//! | [`PipelineError::Domain`] | [`DomainError`] raised by middleware or handler | declared | no |
//! | [`PipelineError::Collision`] | middleware re-used a context key | 500 | yes |
//! | [`PipelineError::Unexpected`] | any other error or a panic | 500 | yes |

use std::any::Any;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::context::ContextCollision;
use crate::response::Response;
use crate::schema::Issues;

/// Result type returned by middleware steps and handlers.
///
/// Return a [`DomainError`] (through `?` or `Err(err.into())`) to send a
/// specific status to the caller; any other error is treated as unexpected.
pub type KeystoneResult<T> = Result<T, anyhow::Error>;

/// Default message sent to callers for internal failures.
pub const DEFAULT_INTERNAL_MESSAGE: &str = "Internal server error";

/// One of the four declared input sources of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Path parameters (`/users/:id`).
    Params,
    /// Request body.
    Body,
    /// Query string.
    Query,
    /// `Cookie` header.
    Cookies,
}

impl Channel {
    /// Order in which the request channels are validated after `params`.
    pub const REQUEST_ORDER: [Channel; 3] = [Self::Body, Self::Query, Self::Cookies];

    /// Returns the context key under which this channel is stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::Body => "body",
            Self::Query => "query",
            Self::Cookies => "cookies",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the conventional error name for a status code.
#[must_use]
pub fn default_error_name(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "BAD_REQUEST".to_string(),
        401 => "UNAUTHORIZED".to_string(),
        403 => "FORBIDDEN".to_string(),
        404 => "NOT_FOUND".to_string(),
        405 => "METHOD_NOT_ALLOWED".to_string(),
        408 => "REQUEST_TIMEOUT".to_string(),
        409 => "CONFLICT".to_string(),
        413 => "PAYLOAD_TOO_LARGE".to_string(),
        422 => "UNPROCESSABLE_ENTITY".to_string(),
        429 => "TOO_MANY_REQUESTS".to_string(),
        500 => "INTERNAL_SERVER_ERROR".to_string(),
        502 => "BAD_GATEWAY".to_string(),
        503 => "SERVICE_UNAVAILABLE".to_string(),
        504 => "GATEWAY_TIMEOUT".to_string(),
        other => format!("HTTP_{other}"),
    }
}

/// An application-level error raised with an intended status and message.
///
/// Domain errors are sent to the caller verbatim.
///
/// # Example
///
/// ```
/// use keystone_core::DomainError;
/// use http::StatusCode;
///
/// let err = DomainError::not_found("User not found");
/// assert_eq!(err.code(), StatusCode::NOT_FOUND);
/// assert_eq!(err.name(), "NOT_FOUND");
///
/// let envelope = err.to_envelope();
/// assert_eq!(envelope.code, 404);
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name} ({code}): {}", .message.as_deref().unwrap_or("no message"))]
pub struct DomainError {
    name: String,
    code: StatusCode,
    message: Option<String>,
    cause: Option<Value>,
}

impl DomainError {
    /// Creates a domain error with an explicit name and status.
    #[must_use]
    pub fn new(name: impl Into<String>, code: StatusCode) -> Self {
        Self {
            name: name.into(),
            code,
            message: None,
            cause: None,
        }
    }

    /// Creates a domain error named after the status code.
    #[must_use]
    pub fn from_status(code: StatusCode, message: impl Into<String>) -> Self {
        Self::new(default_error_name(code), code).with_message(message)
    }

    /// 400 `BAD_REQUEST`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::BAD_REQUEST, message)
    }

    /// 401 `UNAUTHORIZED`.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::UNAUTHORIZED, message)
    }

    /// 403 `FORBIDDEN`.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::FORBIDDEN, message)
    }

    /// 404 `NOT_FOUND`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::NOT_FOUND, message)
    }

    /// 409 `CONFLICT`.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::CONFLICT, message)
    }

    /// 422 `UNPROCESSABLE_ENTITY`.
    #[must_use]
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// Sets the human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches an opaque cause payload.
    #[must_use]
    pub fn with_cause(mut self, cause: Value) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Returns the error name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        self.code
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the cause payload, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&Value> {
        self.cause.as_ref()
    }

    /// Converts this error to its wire envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            name: self.name.clone(),
            code: self.code.as_u16(),
            message: self.message.clone(),
            cause: self.cause.clone(),
        }
    }
}

/// The uniform error value sent to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Machine-readable error name.
    pub name: String,
    /// HTTP status code.
    pub code: u16,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Opaque cause payload (validation issues, domain details).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Value>,
}

impl ErrorEnvelope {
    /// Creates an envelope named after the status code.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            name: default_error_name(status),
            code: status.as_u16(),
            message: None,
            cause: None,
        }
    }

    /// Creates the generic 500 envelope.
    #[must_use]
    pub fn internal(message: &str) -> Self {
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR).with_message(message)
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the cause payload.
    #[must_use]
    pub fn with_cause(mut self, cause: Value) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Returns the HTTP status for this envelope.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Serializes the envelope into an HTTP response with status `code`.
    #[must_use]
    pub fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::to_vec(&self)
            .unwrap_or_else(|_| br#"{"name":"INTERNAL_SERVER_ERROR","code":500}"#.to_vec());

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl From<DomainError> for ErrorEnvelope {
    fn from(err: DomainError) -> Self {
        Self {
            name: err.name,
            code: err.code.as_u16(),
            message: err.message,
            cause: err.cause,
        }
    }
}

/// A failure at any stage of the request pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A declared schema rejected a channel.
    #[error("invalid {channel}: {} issue(s)", .issues.len())]
    Validation {
        /// The rejected channel.
        channel: Channel,
        /// The validator's issue list.
        issues: Issues,
    },

    /// A domain error raised by middleware or the handler.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A middleware step tried to add a key that already exists.
    #[error("middleware '{step}' {source}")]
    Collision {
        /// Name of the offending middleware step.
        step: String,
        /// The rejected key.
        #[source]
        source: ContextCollision,
    },

    /// Any other failure.
    #[error("unexpected error: {0:#}")]
    Unexpected(anyhow::Error),
}

impl PipelineError {
    /// Classifies an error raised by middleware or a handler.
    ///
    /// [`DomainError`]s keep their identity; everything else is unexpected.
    #[must_use]
    pub fn from_raised(err: anyhow::Error) -> Self {
        match err.downcast::<DomainError>() {
            Ok(domain) => Self::Domain(domain),
            Err(other) => Self::Unexpected(other),
        }
    }

    /// Converts a panic payload caught at a stage boundary.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Unexpected(anyhow::anyhow!("panicked: {detail}"))
    }

    /// Returns `true` if this failure must be logged and hidden from callers.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Collision { .. } | Self::Unexpected(_))
    }

    /// Short name of the error kind, for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Domain(_) => "domain",
            Self::Collision { .. } => "context_collision",
            Self::Unexpected(_) => "unexpected",
        }
    }

    /// Builds the caller-facing envelope.
    ///
    /// Internal failures only ever expose `internal_message`.
    #[must_use]
    pub fn to_envelope(&self, internal_message: &str) -> ErrorEnvelope {
        match self {
            Self::Validation { channel, issues } => validation_envelope(*channel, issues),
            Self::Domain(err) => err.to_envelope(),
            Self::Collision { .. } | Self::Unexpected(_) => ErrorEnvelope::internal(internal_message),
        }
    }
}

fn validation_envelope(channel: Channel, issues: &Issues) -> ErrorEnvelope {
    let cause = serde_json::to_value(issues).unwrap_or(Value::Null);

    match channel {
        Channel::Params => {
            let message = match issues.first().map(|issue| issue.path.as_str()) {
                Some(param) if !param.is_empty() => format!("Invalid path parameter '{param}'"),
                _ => "Invalid path parameters".to_string(),
            };
            ErrorEnvelope::from_status(StatusCode::NOT_FOUND)
                .with_message(message)
                .with_cause(cause)
        }
        other => ErrorEnvelope::from_status(StatusCode::BAD_REQUEST)
            .with_message(format!("Invalid {other}"))
            .with_cause(cause),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Issue;
    use serde_json::json;

    #[test]
    fn test_domain_error_envelope_is_verbatim() {
        let err = DomainError::not_found("User not found");
        let json = serde_json::to_value(err.to_envelope()).unwrap();
        assert_eq!(
            json,
            json!({"name": "NOT_FOUND", "code": 404, "message": "User not found"})
        );
    }

    #[test]
    fn test_domain_error_custom_name_and_cause() {
        let err = DomainError::new("QUOTA_EXCEEDED", StatusCode::TOO_MANY_REQUESTS)
            .with_message("slow down")
            .with_cause(json!({"retry_after": 30}));

        let envelope = ErrorEnvelope::from(err);
        assert_eq!(envelope.name, "QUOTA_EXCEEDED");
        assert_eq!(envelope.code, 429);
        assert_eq!(envelope.cause, Some(json!({"retry_after": 30})));
    }

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::forbidden("nope");
        assert_eq!(err.to_string(), "FORBIDDEN (403 Forbidden): nope");
    }

    #[test]
    fn test_from_raised_detects_domain_error() {
        let raised: anyhow::Error = DomainError::conflict("taken").into();
        let err = PipelineError::from_raised(raised);
        assert!(matches!(err, PipelineError::Domain(_)));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_from_raised_other_errors_are_unexpected() {
        let err = PipelineError::from_raised(anyhow::anyhow!("database is down"));
        assert!(err.is_internal());
        assert_eq!(err.kind(), "unexpected");

        let envelope = err.to_envelope(DEFAULT_INTERNAL_MESSAGE);
        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.message.as_deref(), Some(DEFAULT_INTERNAL_MESSAGE));
        assert!(envelope.cause.is_none());
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = PipelineError::from_panic(Box::new("boom"));
        assert!(err.to_string().contains("boom"));

        let err = PipelineError::from_panic(Box::new(String::from("bang")));
        assert!(err.to_string().contains("bang"));

        let err = PipelineError::from_panic(Box::new(42_u8));
        assert!(err.to_string().contains("non-string"));
    }

    #[test]
    fn test_params_validation_is_not_found() {
        let issues = Issues::single(Issue::new("id", "expected a numeric string"));
        let err = PipelineError::Validation {
            channel: Channel::Params,
            issues,
        };
        let envelope = err.to_envelope(DEFAULT_INTERNAL_MESSAGE);
        assert_eq!(envelope.code, 404);
        assert_eq!(envelope.name, "NOT_FOUND");
        assert_eq!(envelope.message.as_deref(), Some("Invalid path parameter 'id'"));
        assert_eq!(envelope.cause.unwrap()[0]["path"], "id");
    }

    #[test]
    fn test_body_validation_is_bad_request() {
        let issues = Issues::single(Issue::new("name", "Missing required field: name"));
        let err = PipelineError::Validation {
            channel: Channel::Body,
            issues,
        };
        let envelope = err.to_envelope(DEFAULT_INTERNAL_MESSAGE);
        assert_eq!(envelope.code, 400);
        assert_eq!(envelope.message.as_deref(), Some("Invalid body"));
    }

    #[test]
    fn test_envelope_into_response() {
        let response = ErrorEnvelope::from_status(StatusCode::CONFLICT).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_envelope_omits_absent_fields() {
        let json = serde_json::to_string(&ErrorEnvelope::from_status(StatusCode::BAD_GATEWAY))
            .unwrap();
        assert_eq!(json, r#"{"name":"BAD_GATEWAY","code":502}"#);
    }

    #[test]
    fn test_default_error_names() {
        assert_eq!(default_error_name(StatusCode::NOT_FOUND), "NOT_FOUND");
        assert_eq!(default_error_name(StatusCode::IM_A_TEAPOT), "HTTP_418");
    }
}
