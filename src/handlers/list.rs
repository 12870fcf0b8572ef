//! List handlers. Every route requires a session, and a list can only be
//! read or changed by the user who owns it.

use super::shared::{
    collaborator_failure, json_body, non_blank, reject, require_session, required_param, Reply,
    SignedIn,
};
use crate::app_state::AppState;
use crate::domain::{List, ListWithItems, NewList};
use crate::response;
use crate::router::IncomingRequest;
use axum::http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug separator pattern is valid"));

#[derive(Debug, Deserialize)]
struct ListBody {
    name: Option<String>,
}

/// URL-safe slug for a list name: lower-case ASCII letters and digits with
/// every other run of characters collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    // ---
    SLUG_SEPARATORS
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// The list named `slug`, provided `session` owns it.
///
/// 404 when there is no such list, 403 with `forbidden` when someone else
/// owns it. Lookup failures are classified with `failure_status`.
pub(super) async fn load_owned_list(
    state: &AppState,
    request: &IncomingRequest,
    session: &SignedIn,
    slug: &str,
    forbidden: &str,
    failure_status: Option<StatusCode>,
) -> Result<List, axum::response::Response> {
    // ---
    let list = state
        .repository()
        .find_list(slug)
        .await
        .map_err(|err| collaborator_failure(request, err, failure_status))?
        .ok_or_else(|| reject(request, StatusCode::NOT_FOUND, "List not found"))?;

    if !list.is_owned_by(session.user_id) {
        tracing::warn!(user_id = %session.user_id, slug, "Rejected access to another user's list");
        return Err(reject(request, StatusCode::FORBIDDEN, forbidden));
    }

    Ok(list)
}

/// Validated `{name}` body and the slug derived from it.
fn name_and_slug(request: &IncomingRequest) -> Result<(String, String), axum::response::Response> {
    // ---
    let body: ListBody = json_body(request)?;

    let name = non_blank(body.name)
        .ok_or_else(|| reject(request, StatusCode::UNPROCESSABLE_ENTITY, "Name not supplied"))?;

    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(reject(
            request,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Name must contain at least one letter or number",
        ));
    }

    Ok((name.trim().to_string(), slug))
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/list/`: the caller's lists, ordered by name.
pub async fn get_all_lists(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let session = require_session(&state, &request, "You must be signed in to view your lists")?;

    let lists = state
        .repository()
        .list_lists(session.user_id)
        .await
        .map_err(|err| collaborator_failure(&request, err, Some(StatusCode::BAD_GATEWAY)))?;

    Ok(response::json(&lists, request.origin()))
}

/// `GET /api/list/:slug`: one list with its items.
pub async fn get_list(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let slug = required_param(&request, "slug", "List slug param not supplied")?;
    let session = require_session(&state, &request, "You must be signed in to view a list")?;

    let list = load_owned_list(
        &state,
        &request,
        &session,
        slug,
        "You may only view your own lists",
        Some(StatusCode::BAD_GATEWAY),
    )
    .await?;

    let items = state
        .repository()
        .list_items(list.id)
        .await
        .map_err(|err| collaborator_failure(&request, err, Some(StatusCode::BAD_GATEWAY)))?;

    Ok(response::json(
        &ListWithItems { list, items },
        request.origin(),
    ))
}

/// `POST /api/list/`
#[tracing::instrument(skip_all)]
pub async fn add_list(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let session = require_session(&state, &request, "You must be signed in to add a new list")?;
    let (name, slug) = name_and_slug(&request)?;

    let list = state
        .repository()
        .create_list(NewList {
            name,
            slug,
            user_id: session.user_id,
        })
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    tracing::info!(slug = %list.slug, "List created");
    Ok(response::json(&list, request.origin()))
}

/// `POST /api/list/:slug`: renames a list, which also changes its slug.
#[tracing::instrument(skip_all)]
pub async fn update_list(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let slug = required_param(&request, "slug", "Slug param not supplied")?;
    let session = require_session(&state, &request, "You must be signed in to update a list")?;
    let (name, new_slug) = name_and_slug(&request)?;

    load_owned_list(
        &state,
        &request,
        &session,
        slug,
        "You may only update your own lists",
        None,
    )
    .await?;

    let list = state
        .repository()
        .update_list(slug, &name, &new_slug)
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    Ok(response::json(&list, request.origin()))
}

/// `POST /api/list/delete/:slug`
#[tracing::instrument(skip_all)]
pub async fn delete_list(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let slug = required_param(&request, "slug", "Slug param not supplied")?;
    let session = require_session(&state, &request, "You must be signed in to remove a list")?;

    load_owned_list(
        &state,
        &request,
        &session,
        slug,
        "You may only remove your own lists",
        None,
    )
    .await?;

    state
        .repository()
        .delete_list(slug)
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    tracing::info!(slug, "List removed");
    Ok(response::ok("List removed", request.origin()))
}
