//! Error taxonomy and the exception policy.
//!
//! Two worlds, kept apart on purpose:
//!
//! - [`Error`] — infrastructure failures (binding a port, accepting a
//!   connection). These surface from [`Server::serve`](crate::Server::serve)
//!   and end the process.
//! - [`HttpError`] — request-level failures. These never escape the dispatch
//!   boundary: every variant is converted into an HTTP [`Response`] by the
//!   [`ErrorPolicy`] before anything is written to the wire.
//!
//! Handlers signal domain failures by *returning* an error value, not by
//! panicking: `Err(HttpError::domain("unicorn", msg))`. The policy decides
//! what status and body that kind maps to.

use std::collections::HashMap;
use std::fmt;

use http::StatusCode;

use crate::response::Response;

/// Infrastructure error returned by vane's fallible operations.
///
/// Application-level errors (404, 400, 418, …) are expressed as HTTP
/// [`Response`] values via [`HttpError`] and the [`ErrorPolicy`], never as
/// this type.
#[derive(Debug)]
pub struct Error(std::io::Error);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(e)
    }
}

// ── Startup configuration errors ─────────────────────────────────────────────

/// A route or parameter spec was declared incorrectly. Fatal at startup;
/// never produced while serving traffic.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed path template `{template}`: {reason}")]
    MalformedTemplate { template: String, reason: String },
    #[error("path segment `{{{segment}}}` in `{template}` has no path parameter spec")]
    UnboundSegment { template: String, segment: String },
    // The transport field is `location`, not `source`: thiserror reserves a
    // field named `source` for the error-chaining convention.
    #[error("parameter `{name}` declares source {location} but type {ty} cannot come from it")]
    UnsatisfiableSource { name: String, location: String, ty: String },
    #[error("route conflict: {0}")]
    Conflict(String),
}

// ── Request-level errors ─────────────────────────────────────────────────────

/// One failed constraint, addressed by dotted field path
/// (`body.item.name`, `query.q`, `path.item_id`, …).
#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

/// A batch of [`Violation`]s collected during request validation.
///
/// Validation collects *all* problems up to the router's cap rather than
/// stopping at the first one; `truncated` records that the cap was hit.
#[derive(Debug, Clone, Default)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
    pub truncated: bool,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failure(s)", self.violations.len())
    }
}

/// An application-raised, named error kind.
///
/// The `kind` string keys into the [`ErrorPolicy`] registry; the message is
/// whatever the handler wants the responder to interpolate.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub kind: &'static str,
    pub message: String,
}

/// A request-level failure. Converted to a [`Response`] at the dispatch
/// boundary by the [`ErrorPolicy`]; nothing propagates past it.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("{0}")]
    Validation(ValidationError),
    #[error("no route matches")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("domain error `{}`: {}", .0.kind, .0.message)]
    Domain(DomainError),
    #[error("internal: {0}")]
    Internal(String),
}

impl HttpError {
    /// Shorthand for raising a named domain error from a handler.
    pub fn domain(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Domain(DomainError { kind, message: message.into() })
    }
}

// ── Exception policy ─────────────────────────────────────────────────────────

type Responder = Box<dyn Fn(&DomainError) -> Response + Send + Sync + 'static>;

/// Maps error values to HTTP responses.
///
/// One responder per domain-error kind; registering a kind twice replaces
/// the earlier responder. Unregistered kinds fall through to a generic 500
/// with no internal detail in the body.
///
/// ```rust
/// use vane::{ErrorPolicy, Response};
/// use http::StatusCode;
///
/// let policy = ErrorPolicy::new().on("unicorn", |e| {
///     Response::builder()
///         .status(StatusCode::IM_A_TEAPOT)
///         .json(format!(r#"{{"message":"{}"}}"#, e.message).into_bytes())
/// });
/// ```
pub struct ErrorPolicy {
    responders: HashMap<&'static str, Responder>,
    validation: Option<Box<dyn Fn(&ValidationError) -> Response + Send + Sync + 'static>>,
}

impl ErrorPolicy {
    pub fn new() -> Self {
        Self { responders: HashMap::new(), validation: None }
    }

    /// Register (or replace) the responder for a domain-error kind.
    pub fn on(
        mut self,
        kind: &'static str,
        responder: impl Fn(&DomainError) -> Response + Send + Sync + 'static,
    ) -> Self {
        self.responders.insert(kind, Box::new(responder));
        self
    }

    /// Replace the default validation-error responder.
    pub fn on_validation(
        mut self,
        responder: impl Fn(&ValidationError) -> Response + Send + Sync + 'static,
    ) -> Self {
        self.validation = Some(Box::new(responder));
        self
    }

    /// Convert a request-level error into the response the client sees.
    pub(crate) fn respond(&self, err: &HttpError) -> Response {
        match err {
            HttpError::Validation(v) => match &self.validation {
                Some(r) => r(v),
                None => validation_response(v),
            },
            HttpError::NotFound => Response::status(StatusCode::NOT_FOUND),
            HttpError::MethodNotAllowed => Response::status(StatusCode::METHOD_NOT_ALLOWED),
            HttpError::Domain(d) => match self.responders.get(d.kind) {
                Some(r) => r(d),
                None => {
                    tracing::error!(kind = d.kind, message = %d.message, "unregistered domain error");
                    internal_response()
                }
            },
            HttpError::Internal(msg) => {
                tracing::error!(%msg, "internal error during dispatch");
                internal_response()
            }
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Default body for validation failures: a structured per-field list.
fn validation_response(v: &ValidationError) -> Response {
    let body = serde_json::json!({
        "errors": v.violations,
        "truncated": v.truncated,
    });
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .json(serde_json::to_vec(&body).unwrap_or_default())
}

/// Generic 500. Deliberately carries no internal detail.
fn internal_response() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .json(br#"{"error":"internal server error"}"#.to_vec())
}
