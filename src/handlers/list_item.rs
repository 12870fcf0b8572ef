//! List item handlers. Items are addressed through their list's slug, so
//! every route runs the owner check on that list first.

use super::list::load_owned_list;
use super::shared::{
    collaborator_failure, json_body, non_blank, reject, require_session, required_param,
    uuid_param, Reply,
};
use crate::app_state::AppState;
use crate::domain::{List, ListItem, MediaType, NewListItem};
use crate::response;
use crate::router::IncomingRequest;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

const LIST_SLUG_MISSING: &str = "List slug param not supplied";
const ITEM_ID_MISSING: &str = "List item ID param not supplied";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListItemBody {
    media_type: Option<String>,
    tmdb_id: Option<i64>,
    title: Option<String>,
    subtitle: Option<String>,
    poster_url: Option<String>,
}

/// The item `item_id`, provided it belongs to `list`.
async fn load_item(
    state: &AppState,
    request: &IncomingRequest,
    list: &List,
    item_id: Uuid,
    failure_status: Option<StatusCode>,
) -> Result<ListItem, Response> {
    // ---
    state
        .repository()
        .find_list_item(item_id)
        .await
        .map_err(|err| collaborator_failure(request, err, failure_status))?
        .filter(|item| item.list_id == list.id)
        .ok_or_else(|| reject(request, StatusCode::NOT_FOUND, "List item not found"))
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/list-item/:listSlug`: the list's items, ordered by title.
pub async fn get_list_items(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let slug = required_param(&request, "listSlug", LIST_SLUG_MISSING)?;
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

    Ok(response::json(&items, request.origin()))
}

/// `GET /api/list-item/:listSlug/:id`
pub async fn get_list_item(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let slug = required_param(&request, "listSlug", LIST_SLUG_MISSING)?;
    let item_id = uuid_param(&request, "id", ITEM_ID_MISSING)?;
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

    let item = load_item(
        &state,
        &request,
        &list,
        item_id,
        Some(StatusCode::BAD_GATEWAY),
    )
    .await?;

    Ok(response::json(&item, request.origin()))
}

/// `POST /api/list-item/:listSlug`
#[tracing::instrument(skip_all)]
pub async fn add_list_item(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let slug = required_param(&request, "listSlug", LIST_SLUG_MISSING)?;
    let session = require_session(
        &state,
        &request,
        "You must be signed in to add an item to a list",
    )?;
    let body: ListItemBody = json_body(&request)?;

    let (Some(media_type), Some(tmdb_id), Some(title)) = (
        non_blank(body.media_type),
        body.tmdb_id.filter(|id| *id > 0),
        non_blank(body.title),
    ) else {
        return Err(reject(
            &request,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Media Type, TMDB ID or item title not supplied",
        ));
    };

    let media_type: MediaType = media_type.parse().map_err(|_| {
        reject(
            &request,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Media Type must be one of movie, tv or person",
        )
    })?;

    let list = load_owned_list(
        &state,
        &request,
        &session,
        slug,
        "You may only add items to your own lists",
        None,
    )
    .await?;

    let item = state
        .repository()
        .create_list_item(NewListItem {
            list_id: list.id,
            media_type,
            tmdb_id,
            title,
            subtitle: non_blank(body.subtitle),
            poster_url: non_blank(body.poster_url),
        })
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    tracing::info!(slug, item_id = %item.id, "List item added");
    Ok(response::json(&item, request.origin()))
}

/// `POST /api/list-item/:listSlug/delete/:id`
#[tracing::instrument(skip_all)]
pub async fn delete_list_item(state: AppState, request: IncomingRequest) -> Reply {
    // ---
    let slug = required_param(&request, "listSlug", LIST_SLUG_MISSING)?;
    let item_id = uuid_param(&request, "id", ITEM_ID_MISSING)?;
    let session = require_session(
        &state,
        &request,
        "You must be signed in to remove an item from a list",
    )?;

    let list = load_owned_list(
        &state,
        &request,
        &session,
        slug,
        "You may only remove items from your own lists",
        None,
    )
    .await?;

    load_item(&state, &request, &list, item_id, None).await?;

    state
        .repository()
        .delete_list_item(item_id)
        .await
        .map_err(|err| collaborator_failure(&request, err, None))?;

    tracing::info!(slug, %item_id, "List item removed");
    Ok(response::ok("List item removed", request.origin()))
}
