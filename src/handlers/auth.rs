//! Account handlers: auth state, sign-in, registration, account update and
//! deletion, sign-out.
//!
//! Successful sign-in, registration and account updates attach a freshly
//! issued session cookie; sign-out and account deletion attach a clearing one.

use super::shared::{
    collaborator_failure, json_body, non_blank, reject, require_session, uuid_param, Reply,
};
use crate::app_state::AppState;
use crate::domain::{NewUser, User, UserUpdate};
use crate::response;
use crate::router::IncomingRequest;
use crate::session::SessionPayload;
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SignInBody {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountBody {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

/// Body of `GET /api/auth/`.
#[derive(Debug, Serialize)]
struct AuthState {
    auth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `user` as JSON with a fresh session cookie attached.
fn with_session(state: &AppState, request: &IncomingRequest, user: &User) -> Reply {
    // ---
    let payload = SessionPayload {
        user_id: user.id.to_string(),
        email: user.email.clone(),
    };

    let cookie = state
        .sessions()
        .issue(&payload)
        .map_err(|err| collaborator_failure(request, err, None))?;

    let response = response::json(user, request.origin());
    Ok(response::with_cookie(response, &cookie, request.origin()))
}

/// `{"auth": false}` with a clearing cookie.
fn signed_out_state(state: &AppState, request: &IncomingRequest) -> Response {
    // ---
    let response = response::json(
        &AuthState {
            auth: false,
            user: None,
        },
        request.origin(),
    );
    response::with_cookie(response, &state.sessions().clear(), request.origin())
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/auth/`: reports whether the caller holds a valid session.
pub async fn auth_state(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let Some(payload) = state.sessions().verify(request.cookies()) else {
        return Ok(signed_out_state(&state, &request));
    };

    let Ok(user_id) = payload.user_id.parse::<Uuid>() else {
        return Ok(signed_out_state(&state, &request));
    };

    let user = state
        .repository()
        .find_user_by_id(user_id)
        .await
        .map_err(|err| collaborator_failure(&request, err, Some(StatusCode::BAD_GATEWAY)))?;

    match user {
        Some(user) => Ok(response::json(
            &AuthState {
                auth: true,
                user: Some(user),
            },
            request.origin(),
        )),
        None => {
            tracing::debug!("Session refers to a user that no longer exists");
            Ok(signed_out_state(&state, &request))
        }
    }
}

/// `POST /api/auth/sign-in`
#[tracing::instrument(skip_all)]
pub async fn sign_in(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let body: SignInBody = json_body(&request)?;

    let (Some(email), Some(password)) = (non_blank(body.email), non_blank(body.password)) else {
        return Err(reject(
            &request,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Email or password not supplied",
        ));
    };

    let user = state
        .repository()
        .find_user_by_email(&email)
        .await
        .map_err(|err| collaborator_failure(&request, err, Some(StatusCode::BAD_GATEWAY)))?
        .ok_or_else(|| reject(&request, StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS))?;

    let matches = state
        .hasher()
        .verify(&password, &user.password_hash)
        .await
        .map_err(|err| collaborator_failure(&request, err, Some(StatusCode::BAD_GATEWAY)))?;

    if !matches {
        tracing::info!("Failed sign-in attempt");
        return Err(reject(&request, StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS));
    }

    tracing::info!(user_id = %user.id, "User signed in");
    with_session(&state, &request, &user)
}

/// `POST /api/auth/register`
#[tracing::instrument(skip_all)]
pub async fn register(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let body: AccountBody = json_body(&request)?;

    let (Some(name), Some(email), Some(password)) = (
        non_blank(body.name),
        non_blank(body.email),
        non_blank(body.password),
    ) else {
        return Err(reject(
            &request,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Name, email or password not supplied",
        ));
    };

    let password_hash = state
        .hasher()
        .hash(&password)
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    let user = state
        .repository()
        .create_user(NewUser {
            name,
            email,
            password_hash,
        })
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    tracing::info!(user_id = %user.id, "User registered");
    with_session(&state, &request, &user)
}

/// `PATCH /api/auth/account/:id`: changes the caller's own name, email and
/// optionally password.
#[tracing::instrument(skip_all)]
pub async fn update_account(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let id = uuid_param(&request, "id", "User ID param not supplied")?;
    let session = require_session(
        &state,
        &request,
        "You must be signed in to update account details",
    )?;
    let body: AccountBody = json_body(&request)?;

    let (Some(name), Some(email)) = (non_blank(body.name), non_blank(body.email)) else {
        return Err(reject(
            &request,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Name or email not supplied",
        ));
    };

    if id != session.user_id {
        tracing::warn!(user_id = %session.user_id, requested = %id, "Rejected account update");
        return Err(reject(
            &request,
            StatusCode::FORBIDDEN,
            "You may only update your own account",
        ));
    }

    let password_hash = match non_blank(body.password) {
        Some(password) => Some(
            state
                .hasher()
                .hash(&password)
                .await
                .map_err(|err| collaborator_failure(&request, err, None))?,
        ),
        None => None,
    };

    let user = state
        .repository()
        .update_user(
            id,
            UserUpdate {
                name,
                email,
                password_hash,
            },
        )
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    with_session(&state, &request, &user)
}

/// `POST /api/auth/delete/:id`: removes the caller's own account.
#[tracing::instrument(skip_all)]
pub async fn delete_account(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let id = uuid_param(&request, "id", "User ID param not supplied")?;
    let session = require_session(&state, &request, "You must be signed in to remove an account")?;

    if id != session.user_id {
        tracing::warn!(user_id = %session.user_id, requested = %id, "Rejected account removal");
        return Err(reject(
            &request,
            StatusCode::FORBIDDEN,
            "You may only remove your own account",
        ));
    }

    state
        .repository()
        .delete_user(id)
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    tracing::info!(user_id = %id, "Account removed");
    let response = response::ok("Account removed", request.origin());
    Ok(response::with_cookie(
        response,
        &state.sessions().clear(),
        request.origin(),
    ))
}

/// `POST /api/auth/sign-out`
pub async fn sign_out(state: AppState, request: IncomingRequest) -> Response {
    // ---
    let response = response::ok("Signed Out", request.origin());
    response::with_cookie(response, &state.sessions().clear(), request.origin())
}
