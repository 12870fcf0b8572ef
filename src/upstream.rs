//! Client for the upstream media database API.
//!
//! Outbound URLs always carry the configured API key as the `api_key` query
//! parameter. Upstream bodies are decoded and re-wrapped through the
//! response builder rather than streamed through, so proxied responses get
//! the same CORS headers and error classification as everything else.

use crate::config::MediaApiConfig;
use crate::domain::MetricsPtr;
use crate::response;
use crate::router::IncomingRequest;
use anyhow::{ensure, Context, Result};
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use reqwest::Url;
use std::time::Instant;

/// Query parameter the upstream expects the API key in.
pub const API_KEY_PARAM: &str = "api_key";

/// Builds and relays requests to the upstream media API.
pub struct MediaApiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    metrics: MetricsPtr,
}

impl MediaApiClient {
    // ---

    /// # Errors
    /// Fails when the API key is blank or the base URL does not parse.
    /// Both are deployment errors, caught at startup.
    pub fn new(config: &MediaApiConfig, metrics: MetricsPtr) -> Result<Self> {
        // ---
        ensure!(
            !config.api_key.trim().is_empty(),
            "The Movie DB api key missing"
        );

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid media API base URL `{}`", config.base_url))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            metrics,
        })
    }

    /// The fully qualified upstream URL for `path` with `params`.
    ///
    /// `path` gets exactly one leading slash. Caller parameters are kept in
    /// order except any `api_key`, which is replaced by the configured key.
    ///
    /// # Errors
    /// Fails when `path` is blank.
    pub fn build_upstream_url(&self, path: &str, params: &[(String, String)]) -> Result<Url> {
        // ---
        let path = path.trim();
        ensure!(!path.is_empty(), "The Movie DB api url missing");

        let mut url = self.base_url.clone();
        let full_path = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&full_path);

        url.query_pairs_mut()
            .clear()
            .extend_pairs(params.iter().filter(|(name, _)| name != API_KEY_PARAM))
            .append_pair(API_KEY_PARAM, &self.api_key);

        Ok(url)
    }

    /// Relays `path` upstream, forwarding the caller's query string.
    pub async fn proxy(&self, path: &str, request: &IncomingRequest) -> Response {
        // ---
        self.proxy_with(path, request.query(), request.origin()).await
    }

    /// Relays `path` upstream with explicit query parameters.
    pub async fn proxy_with(
        &self,
        path: &str,
        params: &[(String, String)],
        origin: Option<&str>,
    ) -> Response {
        // ---
        match self.build_upstream_url(path, params) {
            Ok(url) => self.relay(url, origin).await,
            Err(err) => {
                tracing::error!("Unable to build upstream URL: {err}");
                response::build_error(err, origin, None)
            }
        }
    }

    /// Performs a GET against `url` and wraps the upstream reply.
    ///
    /// JSON replies are decoded and re-serialised; anything else is passed
    /// on as text. The upstream status code is preserved. Transport
    /// failures become a 500 whose message never contains the URL.
    #[tracing::instrument(skip(self, url, origin), fields(path = %url.path()))]
    pub async fn relay(&self, url: Url, origin: Option<&str>) -> Response {
        // ---
        let start = Instant::now();

        let upstream = match self.http.get(url).send().await {
            Ok(upstream) => upstream,
            Err(err) => {
                let err = err.without_url();
                tracing::error!("Upstream request failed: {err}");
                self.metrics.record_upstream_call(start, None);
                return response::build_error(
                    anyhow::Error::new(err).context("Upstream request failed"),
                    origin,
                    None,
                );
            }
        };

        let status = upstream.status();
        self.metrics.record_upstream_call(start, Some(status.as_u16()));

        let is_json = upstream
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));

        if is_json {
            match upstream.json::<serde_json::Value>().await {
                Ok(body) => response::build(body, status, origin),
                Err(err) => {
                    let err = err.without_url();
                    tracing::error!("Upstream returned malformed JSON: {err}");
                    response::build_error(
                        anyhow::Error::new(err).context("Upstream returned malformed JSON"),
                        origin,
                        None,
                    )
                }
            }
        } else {
            match upstream.text().await {
                Ok(body) => response::build(body, status, origin),
                Err(err) => {
                    let err = err.without_url();
                    tracing::error!("Unable to read upstream body: {err}");
                    response::build_error(
                        anyhow::Error::new(err).context("Unable to read upstream body"),
                        origin,
                        None,
                    )
                }
            }
        }
    }
}
