//! Uniform response envelope.
//!
//! Every response the gateway emits, success or failure, is produced here so
//! that each one carries the same CORS headers and body shape. Bodies are
//! either raw text or JSON; errors are classified into a status code by
//! [`build_error`], which accepts any [`Failure`] and never fails itself.

use crate::domain::StoreError;
use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE, SET_COOKIE, VARY,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;

const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
const TEXT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

const ALLOWED_METHODS: &str = "GET,PUT,POST";
const MAX_AGE_SECONDS: &str = "86400";

/// Body returned for a persistence unique-key conflict.
pub const UNIQUE_VIOLATION_MESSAGE: &str = "A record with that unique value already exists";

/// Body returned when nothing more specific can be said about a failure.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Body of the not-found response.
pub const NOT_FOUND_MESSAGE: &str = "404, not found!";

// ============================================================================
// Success envelope
// ============================================================================

/// Response body: sent verbatim as text, or serialised as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// Builds a response with CORS headers for `origin`.
///
/// Text bodies are sent as-is; JSON bodies are serialised and tagged
/// `application/json`.
pub fn build(body: impl Into<Payload>, status: StatusCode, origin: Option<&str>) -> Response {
    // ---
    let (content_type, bytes) = match body.into() {
        Payload::Text(text) => (TEXT_CONTENT_TYPE, text.into_bytes()),
        Payload::Json(value) => (JSON_CONTENT_TYPE, value.to_string().into_bytes()),
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    apply_cors(headers, origin);

    response
}

/// `200 OK` shorthand for [`build`].
pub fn ok(body: impl Into<Payload>, origin: Option<&str>) -> Response {
    // ---
    build(body, StatusCode::OK, origin)
}

/// Serialises `value` into a `200 OK` JSON response.
///
/// A value that cannot be represented as JSON goes through [`build_error`].
pub fn json<T: Serialize>(value: &T, origin: Option<&str>) -> Response {
    // ---
    match serde_json::to_value(value) {
        Ok(value) => ok(value, origin),
        Err(err) => build_error(anyhow::Error::new(err), origin, None),
    }
}

/// The fallback response for unmatched requests.
pub fn not_found(origin: Option<&str>) -> Response {
    // ---
    build(NOT_FOUND_MESSAGE, StatusCode::NOT_FOUND, origin)
}

/// Appends a `Set-Cookie` header to `response`.
///
/// A cookie string that is not a valid header value is a server fault and
/// replaces the response with a 500.
pub fn with_cookie(mut response: Response, cookie: &str, origin: Option<&str>) -> Response {
    // ---
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
            response
        }
        Err(err) => {
            tracing::error!("Refusing to emit invalid Set-Cookie header: {err}");
            build_error(anyhow::Error::new(err), origin, None)
        }
    }
}

fn apply_cors(headers: &mut HeaderMap, origin: Option<&str>) {
    // ---
    let allow_origin = origin
        .and_then(|origin| HeaderValue::from_str(origin).ok())
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECONDS));

    if origin.is_some() {
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
}

// ============================================================================
// Error envelope
// ============================================================================

/// Any failure a handler may need to turn into a response.
#[derive(Debug)]
pub enum Failure {
    /// A bare message.
    Text(String),
    /// An error value, possibly wrapping a [`StoreError`].
    Error(anyhow::Error),
    /// Nothing usable was captured.
    Unknown,
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Failure::Error(err)
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::Error(err.into())
    }
}

impl From<String> for Failure {
    fn from(text: String) -> Self {
        Failure::Text(text)
    }
}

impl From<&str> for Failure {
    fn from(text: &str) -> Self {
        Failure::Text(text.to_string())
    }
}

impl<E: Into<Failure>> From<Option<E>> for Failure {
    fn from(failure: Option<E>) -> Self {
        failure.map_or(Failure::Unknown, Into::into)
    }
}

/// Classifies `failure` into a text response with CORS headers.
///
/// | failure                         | status                     | body                         |
/// |---------------------------------|----------------------------|------------------------------|
/// | `StoreError::UniqueViolation`   | 422                        | [`UNIQUE_VIOLATION_MESSAGE`] |
/// | `StoreError::Data`              | `status` or 400            | store message                |
/// | other error                     | `status` or 500            | error message                |
/// | text                            | `status` or 500            | the text                     |
/// | unknown                         | `status` or 500            | [`UNKNOWN_ERROR_MESSAGE`]    |
///
/// An empty message is replaced by [`UNKNOWN_ERROR_MESSAGE`].
pub fn build_error(
    failure: impl Into<Failure>,
    origin: Option<&str>,
    status: Option<StatusCode>,
) -> Response {
    // ---
    let (status, message) = classify(failure.into(), status);

    let message = if message.trim().is_empty() {
        UNKNOWN_ERROR_MESSAGE.to_string()
    } else {
        message
    };

    build(message, status, origin)
}

fn classify(failure: Failure, status: Option<StatusCode>) -> (StatusCode, String) {
    // ---
    match failure {
        Failure::Error(err) => match err.downcast_ref::<StoreError>() {
            Some(StoreError::UniqueViolation) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                UNIQUE_VIOLATION_MESSAGE.to_string(),
            ),
            Some(StoreError::Data(message)) => (
                status.unwrap_or(StatusCode::BAD_REQUEST),
                message.clone(),
            ),
            None => (
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.to_string(),
            ),
        },
        Failure::Text(text) => (status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), text),
        Failure::Unknown => (
            status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            UNKNOWN_ERROR_MESSAGE.to_string(),
        ),
    }
}
