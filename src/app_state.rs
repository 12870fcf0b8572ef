//! Application state management.
//!
//! `AppState` bundles the collaborators every handler may need: the
//! persistence repository, the password hasher, the session codec, the
//! upstream media client and the metrics back-end. It is built once at
//! startup, never mutated, and cloned cheaply per request since every
//! field sits behind an `Arc`.

use crate::domain::{MetricsPtr, PasswordHasherPtr, RepositoryPtr};
use crate::session::SessionCodec;
use crate::upstream::MediaApiClient;
use std::sync::Arc;

/// Shared application state handed to every route handler.
///
/// Handlers depend on the `Repository`, `PasswordHasher` and `Metrics`
/// abstractions rather than concrete back-ends, so tests can swap in
/// in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    /// Users, lists and list items.
    repository: RepositoryPtr,

    /// One-way password hashing for sign-in and registration.
    hasher: PasswordHasherPtr,

    /// Issues and verifies the session cookie.
    sessions: Arc<SessionCodec>,

    /// Proxies search, detail and trending requests upstream.
    media: Arc<MediaApiClient>,

    /// Prometheus or no-op.
    metrics: MetricsPtr,
}

impl AppState {
    // ---

    pub fn new(
        repository: RepositoryPtr,
        hasher: PasswordHasherPtr,
        sessions: SessionCodec,
        media: MediaApiClient,
        metrics: MetricsPtr,
    ) -> Self {
        // ---
        AppState {
            repository,
            hasher,
            sessions: Arc::new(sessions),
            media: Arc::new(media),
            metrics,
        }
    }

    pub fn repository(&self) -> &RepositoryPtr {
        &self.repository
    }

    pub fn hasher(&self) -> &PasswordHasherPtr {
        &self.hasher
    }

    pub fn sessions(&self) -> &SessionCodec {
        &self.sessions
    }

    pub fn media(&self) -> &MediaApiClient {
        &self.media
    }

    pub fn metrics(&self) -> &MetricsPtr {
        &self.metrics
    }
}
