//! Steps every resource handler repeats: parameter extraction, session
//! checks, body parsing and collaborator failure reporting.
//!
//! Each helper returns the ready-made error response in its `Err` arm so
//! handlers can short-circuit with `?`.

use crate::app_state::AppState;
use crate::response;
use crate::router::IncomingRequest;
use axum::http::StatusCode;
use axum::response::Response;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Handler outcome. Both arms are complete responses.
pub type Reply = Result<Response, Response>;

/// Body returned when the request body is not the expected JSON shape.
pub const EXPECTED_JSON_MESSAGE: &str = "Expected JSON not supplied";

// ============================================================================
// Request/Response Types
// ============================================================================

/// The caller identified by a verified session cookie.
#[derive(Debug, Clone)]
pub struct SignedIn {
    // ---
    pub user_id: Uuid,
    pub email: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Text response with `status`, carrying CORS headers for the caller.
pub fn reject(request: &IncomingRequest, status: StatusCode, message: &str) -> Response {
    // ---
    response::build(message, status, request.origin())
}

/// A path parameter that must be present; 422 with `message` otherwise.
pub fn required_param<'a>(
    request: &'a IncomingRequest,
    name: &str,
    message: &str,
) -> Result<&'a str, Response> {
    // ---
    request
        .param(name)
        .ok_or_else(|| reject(request, StatusCode::UNPROCESSABLE_ENTITY, message))
}

/// A path parameter that must be a UUID; 422 with `message` otherwise.
pub fn uuid_param(request: &IncomingRequest, name: &str, message: &str) -> Result<Uuid, Response> {
    // ---
    required_param(request, name, message)?
        .parse()
        .map_err(|_| reject(request, StatusCode::UNPROCESSABLE_ENTITY, message))
}

/// The verified session of the caller; 401 with `message` otherwise.
///
/// A token whose user id is not a UUID is treated like no token at all.
pub fn require_session(
    state: &AppState,
    request: &IncomingRequest,
    message: &str,
) -> Result<SignedIn, Response> {
    // ---
    let unauthorized = || reject(request, StatusCode::UNAUTHORIZED, message);

    let Some(payload) = state.sessions().verify(request.cookies()) else {
        tracing::debug!("No valid session for {} {}", request.method(), request.path());
        return Err(unauthorized());
    };

    let user_id = payload.user_id.parse().map_err(|_| {
        tracing::debug!("Session user id is not a UUID");
        unauthorized()
    })?;

    Ok(SignedIn {
        user_id,
        email: payload.email,
    })
}

/// Parses the request body as `T`; 422 when it is not valid JSON of that shape.
pub fn json_body<T: DeserializeOwned>(request: &IncomingRequest) -> Result<T, Response> {
    // ---
    request.json().map_err(|err| {
        tracing::debug!("Rejected request body: {err}");
        reject(
            request,
            StatusCode::UNPROCESSABLE_ENTITY,
            EXPECTED_JSON_MESSAGE,
        )
    })
}

/// `Some` only for values that are present and not blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Logs a collaborator failure and classifies it into a response.
pub fn collaborator_failure(
    request: &IncomingRequest,
    err: anyhow::Error,
    status: Option<StatusCode>,
) -> Response {
    // ---
    tracing::error!("{} {} failed: {err:#}", request.method(), request.path());
    response::build_error(err, request.origin(), status)
}
