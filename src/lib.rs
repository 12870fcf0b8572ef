// src/lib.rs
use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;

use handlers::{media_routes, MediaKind};
use router::{IncomingRequest, Router};

// Public exports (visible outside this module)
pub mod domain;
pub mod response;
pub mod router;
pub mod session;
pub mod upstream;

// Internal-only exports (sibling access within this module)
mod app_state;
mod config;
mod handlers;
mod infrastructure;

// Hoist up only the public symbol(s)
pub use app_state::AppState;
pub use config::*;
pub use handlers::slugify;

// Publicly expose the infrastructure creation functions
pub use infrastructure::{
    connect_with_retry, // ---
    create_bcrypt_hasher,
    create_noop_metrics,
    create_postgres_repository,
    create_prom_metrics,
    BcryptHasher,
    BCRYPT_COST,
};

/// Largest request body the gateway buffers.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Resource families used as the `resource` metrics label.
const RESOURCE_FAMILIES: &[&str] = &[
    "auth",
    "list",
    "list-item",
    "metrics",
    "movie",
    "person",
    "search",
    "trending",
    "tv",
];

/// The complete gateway route table, rooted at `/api`.
///
/// # Errors
/// Returns an error if any route pattern fails to compile.
pub fn gateway_routes() -> Result<Router<AppState>> {
    // ---
    let auth = Router::with_base("/api/auth")
        .get("/", handlers::auth_state)?
        .post("/sign-in", handlers::sign_in)?
        .post("/register", handlers::register)?
        .patch("/account/:id", handlers::update_account)?
        .post("/account/:id", handlers::update_account)?
        .post("/delete/:id", handlers::delete_account)?
        .post("/sign-out", handlers::sign_out)?;

    let list = Router::with_base("/api/list")
        .get("/", handlers::get_all_lists)?
        .get("/:slug", handlers::get_list)?
        .post("/", handlers::add_list)?
        .post("/:slug", handlers::update_list)?
        .post("/delete/:slug", handlers::delete_list)?;

    let list_item = Router::with_base("/api/list-item")
        .get("/:listSlug", handlers::get_list_items)?
        .get("/:listSlug/:id", handlers::get_list_item)?
        .post("/:listSlug", handlers::add_list_item)?
        .post("/:listSlug/delete/:id", handlers::delete_list_item)?;

    Router::with_base("/api")
        .get("/trending", handlers::trending)?
        .get("/search", handlers::multi_search)?
        .get("/metrics", handlers::metrics_handler)?
        .mount("/movie/*", media_routes(MediaKind::Movie)?)?
        .mount("/tv/*", media_routes(MediaKind::Tv)?)?
        .mount("/person/*", media_routes(MediaKind::Person)?)?
        .mount("/auth/*", auth)?
        .mount("/list/*", list)?
        .mount("/list-item/*", list_item)?
        .all("*", |_, request: IncomingRequest| async move {
            response::not_found(request.origin())
        })
}

/// Wraps the gateway route table in an axum service.
///
/// Axum only provides the transport: every request lands in a single
/// fallback that buffers the body and hands an [`IncomingRequest`] to the
/// gateway router.
pub fn build_app(state: AppState) -> Result<axum::Router> {
    // ---
    let routes = Arc::new(gateway_routes()?);

    let app = axum::Router::new()
        .fallback(move |State(state): State<AppState>, request: Request| {
            let routes = Arc::clone(&routes);
            async move { serve(&routes, state, request).await }
        })
        .with_state(state);

    Ok(app)
}

/// Builds every collaborator from `config` and returns the ready service.
///
/// # Errors
/// Fails when the database is unreachable after all retries, migrations
/// fail, or the session or upstream settings are unusable.
pub async fn create_app(config: &AppConfig) -> Result<axum::Router> {
    // ---
    let metrics = if config.server.prometheus_enabled() {
        create_prom_metrics()?
    } else {
        create_noop_metrics()?
    };

    let pool = connect_with_retry(&config.database).await?;
    let repository = create_postgres_repository(pool);
    let hasher = create_bcrypt_hasher(BCRYPT_COST);
    let sessions = session::SessionCodec::new(&config.session)?;
    let media = upstream::MediaApiClient::new(&config.media_api, metrics.clone())?;

    build_app(AppState::new(repository, hasher, sessions, media, metrics))
}

async fn serve(routes: &Router<AppState>, state: AppState, request: Request) -> Response {
    // ---
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let response = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => {
            let request = IncomingRequest::from_parts(&parts, body);
            routes.dispatch(state.clone(), request).await
        }
        Err(err) => {
            tracing::warn!("Unable to read request body: {err}");
            let origin = parts
                .headers
                .get(axum::http::header::ORIGIN)
                .and_then(|value| value.to_str().ok());
            response::build_error(
                "Request body could not be read",
                origin,
                Some(StatusCode::BAD_REQUEST),
            )
        }
    };

    let path = parts.uri.path();
    let status = response.status().as_u16();
    tracing::info!("{} {} -> {}", parts.method, path, status);

    state
        .metrics()
        .record_http_request(start, resource_family(path), parts.method.as_str(), status);

    response
}

/// The first segment after `/api`, or `other` for anything unrecognised.
fn resource_family(path: &str) -> &'static str {
    // ---
    path.strip_prefix("/api/")
        .and_then(|rest| rest.split('/').next())
        .and_then(|segment| {
            RESOURCE_FAMILIES
                .iter()
                .copied()
                .find(|family| *family == segment)
        })
        .unwrap_or("other")
}
