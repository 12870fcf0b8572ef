//! Upstream media handlers: per-kind search, detail and credits, plus the
//! cross-kind search and trending feeds. All of them are public and forward
//! the caller's query string.

use super::shared::{reject, required_param, Reply};
use crate::app_state::AppState;
use crate::router::{IncomingRequest, Router};
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::Response;

/// A family of upstream media records with its own sub-router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Tv,
    Person,
}

impl MediaKind {
    // ---

    /// Path segment shared by the gateway and the upstream API.
    pub fn segment(self) -> &'static str {
        // ---
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
            MediaKind::Person => "person",
        }
    }

    fn missing_id_message(self) -> &'static str {
        // ---
        match self {
            MediaKind::Movie => "Movie ID param not supplied",
            MediaKind::Tv => "TV ID param not supplied",
            MediaKind::Person => "Person ID param not supplied",
        }
    }

    /// Upstream path for the credits of `id`. People have combined
    /// (cast and crew, film and TV) credits instead.
    fn credits_path(self, id: &str) -> String {
        // ---
        match self {
            MediaKind::Person => format!("/person/{id}/combined_credits"),
            kind => format!("/{}/{id}/credits", kind.segment()),
        }
    }
}

/// Sub-router for `kind`, mounted at `/api/{kind}`.
///
/// `/search` is registered before `/:id` so it is never read as an id.
pub fn media_routes(kind: MediaKind) -> Result<Router<AppState>> {
    // ---
    Router::with_base(format!("/api/{}", kind.segment()))
        .get("/search", move |state, request| search(state, request, kind))?
        .get("/:id", move |state, request| detail(state, request, kind))?
        .get("/:id/credits", move |state, request| credits(state, request, kind))
}

/// Numeric upstream id; 422 when missing or not a number.
fn media_id(request: &IncomingRequest, kind: MediaKind) -> Result<String, Response> {
    // ---
    let id = required_param(request, "id", kind.missing_id_message())?;

    match id.parse::<u64>() {
        Ok(id) => Ok(id.to_string()),
        Err(_) => Err(reject(
            request,
            StatusCode::UNPROCESSABLE_ENTITY,
            kind.missing_id_message(),
        )),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/{kind}/search`
pub async fn search(state: AppState, request: IncomingRequest, kind: MediaKind) -> Response {
    // ---
    let path = format!("/search/{}", kind.segment());
    state.media().proxy(&path, &request).await
}

/// `GET /api/{kind}/:id`
pub async fn detail(state: AppState, request: IncomingRequest, kind: MediaKind) -> Reply {
    // ---
    let id = media_id(&request, kind)?;
    let path = format!("/{}/{id}", kind.segment());

    Ok(state.media().proxy(&path, &request).await)
}

/// `GET /api/{kind}/:id/credits`
pub async fn credits(state: AppState, request: IncomingRequest, kind: MediaKind) -> Reply {
    // ---
    let id = media_id(&request, kind)?;

    Ok(state.media().proxy(&kind.credits_path(&id), &request).await)
}

/// `GET /api/search`: movies, TV shows and people in one result set.
pub async fn multi_search(state: AppState, request: IncomingRequest) -> Response {
    // ---
    state.media().proxy("/search/multi", &request).await
}

/// `GET /api/trending`: today's trending titles of every kind.
pub async fn trending(state: AppState, request: IncomingRequest) -> Response {
    // ---
    state.media().proxy("/trending/all/day", &request).await
}
