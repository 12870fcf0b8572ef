//! Ordered method + path dispatch.
//!
//! A [`Router`] owns an ordered list of route entries, each binding a
//! method filter and a compiled path pattern to either an endpoint handler
//! or a mounted child router. Dispatch walks the list in registration order
//! and the first entry whose method and pattern both match wins. A mounted
//! child that has no match of its own hands control back to its parent,
//! which carries on with its next entry.
//!
//! Patterns are `/`-separated segments:
//!
//! - literal segments match themselves,
//! - `:name` binds one non-empty segment to `name`,
//! - `*` matches any remaining suffix (used to mount child routers).
//!
//! A router's base prefix is prepended to every pattern it registers, and
//! trailing slashes on the request path are ignored.

use crate::response;
use anyhow::{ensure, Context, Result};
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{request::Parts, HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// Request
// ============================================================================

/// An inbound request as seen by handlers.
///
/// Built once from the transport request, with the path parameters of the
/// matched route resolved by the router before the handler runs.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    params: BTreeMap<String, String>,
}

impl IncomingRequest {
    // ---
    pub fn new(
        method: Method,
        path: impl Into<String>,
        query: Vec<(String, String)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        // ---
        Self {
            method,
            path: path.into(),
            query,
            headers,
            body,
            params: BTreeMap::new(),
        }
    }

    /// Builds a request from transport parts and an already-buffered body.
    ///
    /// An undecodable query string is treated as empty.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        // ---
        let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();

        Self::new(
            parts.method.clone(),
            parts.uri.path(),
            query,
            parts.headers.clone(),
            body,
        )
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded query string pairs, in request order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        // ---
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The `Origin` header, echoed back in CORS headers.
    pub fn origin(&self) -> Option<&str> {
        self.header("origin")
    }

    /// The raw `Cookie` header.
    pub fn cookies(&self) -> Option<&str> {
        self.header("cookie")
    }

    /// A path parameter bound by the matched route. Blank values count as absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        // ---
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        // ---
        serde_json::from_slice(&self.body)
    }

    fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        // ---
        self.params = params;
        self
    }
}

// ============================================================================
// Route table
// ============================================================================

/// Method filter of a route entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMethod {
    Get,
    Post,
    Patch,
    /// Matches every method.
    All,
}

impl RouteMethod {
    fn accepts(self, method: &Method) -> bool {
        // ---
        match self {
            RouteMethod::Get => method == Method::GET,
            RouteMethod::Post => method == Method::POST,
            RouteMethod::Patch => method == Method::PATCH,
            RouteMethod::All => true,
        }
    }
}

type BoxedHandler<S> = Arc<dyn Fn(S, IncomingRequest) -> BoxFuture<'static, Response> + Send + Sync>;

enum Target<S> {
    Endpoint(BoxedHandler<S>),
    Mount(Router<S>),
}

struct RouteEntry<S> {
    method: RouteMethod,
    pattern: String,
    matcher: Regex,
    target: Target<S>,
}

impl<S> RouteEntry<S> {
    /// Parameters bound by this entry, or `None` if `path` does not match.
    fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        // ---
        let captures = self.matcher.captures(path)?;

        Some(
            self.matcher
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|value| (name.to_string(), value.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// An ordered route table with an optional base prefix.
///
/// `S` is the state handed to every handler; it is cloned per request.
pub struct Router<S> {
    base: String,
    routes: Vec<RouteEntry<S>>,
}

impl<S> Default for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // ---

    /// A router with no base prefix.
    pub fn new() -> Self {
        Self::with_base("")
    }

    /// A router whose patterns all live under `base` (e.g. `/api/movie`).
    pub fn with_base(base: impl Into<String>) -> Self {
        // ---
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            routes: Vec::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Appends a route entry.
    ///
    /// # Errors
    /// Returns an error if `pattern` contains an invalid or duplicate
    /// parameter name.
    pub fn register<H, Fut, R>(self, method: RouteMethod, pattern: &str, handler: H) -> Result<Self>
    where
        H: Fn(S, IncomingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        // ---
        let handler: BoxedHandler<S> = Arc::new(move |state, request| {
            handler(state, request)
                .map(|output| output.into_response())
                .boxed()
        });

        self.push(method, pattern, Target::Endpoint(handler))
    }

    pub fn get<H, Fut, R>(self, pattern: &str, handler: H) -> Result<Self>
    where
        H: Fn(S, IncomingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.register(RouteMethod::Get, pattern, handler)
    }

    pub fn post<H, Fut, R>(self, pattern: &str, handler: H) -> Result<Self>
    where
        H: Fn(S, IncomingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.register(RouteMethod::Post, pattern, handler)
    }

    pub fn patch<H, Fut, R>(self, pattern: &str, handler: H) -> Result<Self>
    where
        H: Fn(S, IncomingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.register(RouteMethod::Patch, pattern, handler)
    }

    pub fn all<H, Fut, R>(self, pattern: &str, handler: H) -> Result<Self>
    where
        H: Fn(S, IncomingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.register(RouteMethod::All, pattern, handler)
    }

    /// Mounts `child` for every method under `pattern` (normally ending in `*`).
    ///
    /// The child matches the full request path against its own base, so it
    /// is usually built with the complete prefix (e.g. `/api/movie`).
    pub fn mount(self, pattern: &str, child: Router<S>) -> Result<Self> {
        // ---
        self.push(RouteMethod::All, pattern, Target::Mount(child))
    }

    /// The `(method, full pattern)` pairs of this router, in order.
    pub fn routes(&self) -> impl Iterator<Item = (RouteMethod, &str)> {
        self.routes
            .iter()
            .map(|entry| (entry.method, entry.pattern.as_str()))
    }

    /// Dispatches `request` to the first matching route.
    ///
    /// Falls back to the not-found response when nothing matches.
    pub async fn dispatch(&self, state: S, request: IncomingRequest) -> Response {
        // ---
        match self.try_dispatch(&state, &request).await {
            Some(response) => response,
            None => response::not_found(request.origin()),
        }
    }

    fn try_dispatch<'a>(
        &'a self,
        state: &'a S,
        request: &'a IncomingRequest,
    ) -> BoxFuture<'a, Option<Response>> {
        // ---
        async move {
            for entry in &self.routes {
                if !entry.method.accepts(request.method()) {
                    continue;
                }

                let Some(params) = entry.match_path(request.path()) else {
                    continue;
                };

                match &entry.target {
                    Target::Endpoint(handler) => {
                        tracing::debug!(
                            "{} {} matched {}",
                            request.method(),
                            request.path(),
                            entry.pattern
                        );
                        let request = request.clone().with_params(params);
                        return Some(handler(state.clone(), request).await);
                    }
                    Target::Mount(child) => {
                        if let Some(response) = child.try_dispatch(state, request).await {
                            return Some(response);
                        }
                    }
                }
            }

            None
        }
        .boxed()
    }

    fn push(mut self, method: RouteMethod, pattern: &str, target: Target<S>) -> Result<Self> {
        // ---
        let full = join_pattern(&self.base, pattern);
        let matcher = compile_pattern(&full)?;

        self.routes.push(RouteEntry {
            method,
            pattern: full,
            matcher,
            target,
        });

        Ok(self)
    }
}

fn join_pattern(base: &str, pattern: &str) -> String {
    // ---
    if pattern.starts_with('/') {
        format!("{base}{pattern}")
    } else {
        format!("{base}/{pattern}")
    }
}

/// Compiles a full pattern into an anchored expression.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    // ---
    let mut source = String::from("^");

    for segment in pattern.split('/').filter(|segment| !segment.is_empty()) {
        if segment == "*" {
            source.push_str("(?:/.*)?");
        } else if let Some(name) = segment.strip_prefix(':') {
            ensure!(
                is_param_name(name),
                "Invalid route parameter `{segment}` in `{pattern}`"
            );
            source.push_str(&format!("/(?P<{name}>[^/]+)"));
        } else {
            source.push('/');
            source.push_str(&regex::escape(segment));
        }
    }

    source.push_str("/*$");

    Regex::new(&source).with_context(|| format!("Invalid route pattern `{pattern}`"))
}

fn is_param_name(name: &str) -> bool {
    // ---
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use axum::http::StatusCode;

    fn request(method: Method, path: &str) -> IncomingRequest {
        // ---
        IncomingRequest::new(method, path, Vec::new(), HeaderMap::new(), Bytes::new())
    }

    async fn body_text(response: Response) -> String {
        // ---
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn dispatch(router: &Router<()>, method: Method, path: &str) -> (StatusCode, String) {
        // ---
        let response = router.dispatch((), request(method, path)).await;
        let status = response.status();
        (status, body_text(response).await)
    }

    async fn named(label: &'static str) -> &'static str {
        label
    }

    async fn echo_params(_: (), request: IncomingRequest) -> String {
        // ---
        request
            .params()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        // ---
        let router = Router::with_base("/api/movie")
            .get("/search", |_, _| named("search"))
            .unwrap()
            .get("/:id", |_, _| named("detail"))
            .unwrap()
            .get("/:id/credits", |_, _| named("credits"))
            .unwrap();

        assert_eq!(dispatch(&router, Method::GET, "/api/movie/search").await.1, "search");
        assert_eq!(dispatch(&router, Method::GET, "/api/movie/550").await.1, "detail");
        assert_eq!(
            dispatch(&router, Method::GET, "/api/movie/550/credits").await.1,
            "credits"
        );
    }

    #[tokio::test]
    async fn registration_order_decides_between_overlapping_patterns() {
        // ---
        let router = Router::new()
            .get("/:id", |_, _| named("param"))
            .unwrap()
            .get("/search", |_, _| named("literal"))
            .unwrap();

        assert_eq!(dispatch(&router, Method::GET, "/search").await.1, "param");
    }

    #[tokio::test]
    async fn named_parameters_are_bound() {
        // ---
        let router = Router::with_base("/api/list-item")
            .post("/:listSlug/delete/:id", echo_params)
            .unwrap();

        let (status, body) = dispatch(&router, Method::POST, "/api/list-item/faves/delete/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "id=42,listSlug=faves");
    }

    #[tokio::test]
    async fn trailing_slash_is_optional() {
        // ---
        let router = Router::with_base("/api/list")
            .get("/", |_, _| named("all"))
            .unwrap();

        assert_eq!(dispatch(&router, Method::GET, "/api/list").await.1, "all");
        assert_eq!(dispatch(&router, Method::GET, "/api/list/").await.1, "all");
        assert_eq!(dispatch(&router, Method::GET, "/api/lists").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn method_must_match() {
        // ---
        let router = Router::new()
            .post("/sign-in", |_, _| named("post"))
            .unwrap()
            .all("/anything", |_, _| named("all"))
            .unwrap();

        assert_eq!(dispatch(&router, Method::GET, "/sign-in").await.0, StatusCode::NOT_FOUND);
        assert_eq!(dispatch(&router, Method::POST, "/sign-in").await.1, "post");
        assert_eq!(dispatch(&router, Method::PATCH, "/anything").await.1, "all");
    }

    #[tokio::test]
    async fn base_prefix_is_required() {
        // ---
        let router = Router::with_base("/api")
            .get("/trending", |_, _| named("trending"))
            .unwrap();

        assert_eq!(dispatch(&router, Method::GET, "/api/trending").await.1, "trending");
        assert_eq!(dispatch(&router, Method::GET, "/trending").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mounted_router_handles_its_prefix() {
        // ---
        let movies = Router::with_base("/api/movie")
            .get("/:id", echo_params)
            .unwrap();
        let root = Router::with_base("/api")
            .mount("/movie/*", movies)
            .unwrap()
            .all("*", |_, _| named("fallback"))
            .unwrap();

        assert_eq!(dispatch(&root, Method::GET, "/api/movie/550").await.1, "id=550");
        assert_eq!(dispatch(&root, Method::GET, "/api/movies").await.1, "fallback");
    }

    #[tokio::test]
    async fn unmatched_child_falls_through_to_parent() {
        // ---
        let movies = Router::with_base("/api/movie")
            .get("/:id", |_, _| named("detail"))
            .unwrap();
        let root = Router::with_base("/api")
            .mount("/movie/*", movies)
            .unwrap()
            .post("/movie/:id", |_, _| named("parent"))
            .unwrap();

        assert_eq!(dispatch(&root, Method::POST, "/api/movie/550").await.1, "parent");
        assert_eq!(
            dispatch(&root, Method::DELETE, "/api/movie/550").await.0,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn unmatched_request_is_not_found() {
        // ---
        let router = Router::with_base("/api")
            .get("/search", |_, _| named("search"))
            .unwrap();

        let (status, body) = dispatch(&router, Method::GET, "/elsewhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, response::NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn blank_parameters_read_as_absent() {
        // ---
        let router = Router::new()
            .get("/:slug", |_, request: IncomingRequest| async move {
                request.param("slug").unwrap_or("none").to_string()
            })
            .unwrap();

        assert_eq!(dispatch(&router, Method::GET, "/%20").await.1, "%20");
        assert_eq!(
            request(Method::GET, "/").with_params(BTreeMap::from([(
                "slug".to_string(),
                "  ".to_string()
            )]))
            .param("slug"),
            None
        );
    }

    #[test]
    fn literal_segments_are_escaped() {
        // ---
        let matcher = compile_pattern("/api/v1.0/items").unwrap();

        assert!(matcher.is_match("/api/v1.0/items"));
        assert!(!matcher.is_match("/api/v1x0/items"));
    }

    #[test]
    fn invalid_parameter_names_are_rejected() {
        // ---
        assert!(Router::<()>::new().get("/:1id", |_, _| named("x")).is_err());
        assert!(Router::<()>::new().get("/:", |_, _| named("x")).is_err());
        assert!(Router::<()>::new().get("/:id/:id", |_, _| named("x")).is_err());
    }

    #[test]
    fn route_table_is_introspectable() {
        // ---
        let router = Router::<()>::with_base("/api/auth")
            .get("/", |_, _| named("state"))
            .unwrap()
            .post("/sign-in", |_, _| named("sign-in"))
            .unwrap();

        let routes: Vec<_> = router.routes().collect();
        assert_eq!(
            routes,
            vec![
                (RouteMethod::Get, "/api/auth/"),
                (RouteMethod::Post, "/api/auth/sign-in")
            ]
        );
    }

    #[test]
    fn query_pairs_are_decoded() {
        // ---
        let (parts, _) = axum::http::Request::builder()
            .uri("/api/search?query=the%20thing&page=2")
            .body(())
            .unwrap()
            .into_parts();

        let request = IncomingRequest::from_parts(&parts, Bytes::new());
        assert_eq!(request.path(), "/api/search");
        assert_eq!(
            request.query(),
            &[
                ("query".to_string(), "the thing".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }
}
