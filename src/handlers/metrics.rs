use crate::app_state::AppState;
use crate::response;
use crate::router::IncomingRequest;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

/// Handler for `GET /api/metrics`.
///
/// Returns metrics in Prometheus text format for scraping. The body is
/// empty when the no-op back-end is configured.
pub async fn metrics_handler(state: AppState, request: IncomingRequest) -> Response {
    // ---
    let metrics_text = state.metrics().render();

    let mut response = response::build(metrics_text, StatusCode::OK, request.origin());
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );

    response
}
