// Test helpers are intentionally partially used
#![allow(dead_code)]

use anyhow::Result;
use axum::extract::Query;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use movies_api::domain::{
    List, ListItem, MetricsPtr, NewList, NewListItem, NewUser, Repository, RepositoryPtr,
    StoreError, User, UserUpdate,
};
use movies_api::session::SessionCodec;
use movies_api::upstream::MediaApiClient;
use movies_api::{
    build_app, create_bcrypt_hasher, create_noop_metrics, AppState, Environment, MediaApiConfig,
    SessionConfig,
};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_API_KEY: &str = "integration-test-key";
pub const ORIGIN: &str = "https://movies.example.com";

// ============================================================================
// In-memory repository
// ============================================================================

#[derive(Default)]
struct Store {
    users: Vec<User>,
    lists: Vec<List>,
    items: Vec<ListItem>,
}

/// `Repository` backed by vectors, with the same unique keys as the schema.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    // ---
    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    pub fn list_count(&self) -> usize {
        self.store().lists.len()
    }

    pub fn item_count(&self) -> usize {
        self.store().items.len()
    }

    pub fn list_by_slug(&self, slug: &str) -> Option<List> {
        self.store().lists.iter().find(|l| l.slug == slug).cloned()
    }
}

#[async_trait::async_trait]
impl Repository for InMemoryRepository {
    // ---
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.store().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.store().users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        // ---
        let mut store = self.store();
        if store.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::UniqueViolation.into());
        }

        let user = User::new(new_user);
        store.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> Result<User> {
        // ---
        let mut store = self.store();
        if store
            .users
            .iter()
            .any(|u| u.email == update.email && u.id != user_id)
        {
            return Err(StoreError::UniqueViolation.into());
        }

        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::Data("User not found".to_string()))?;

        user.name = update.name;
        user.email = update.email;
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = chrono::Utc::now();

        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        // ---
        let mut store = self.store();
        let owned: Vec<Uuid> = store
            .lists
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.id)
            .collect();

        store.items.retain(|i| !owned.contains(&i.list_id));
        store.lists.retain(|l| l.user_id != user_id);
        store.users.retain(|u| u.id != user_id);
        Ok(())
    }

    async fn find_list(&self, slug: &str) -> Result<Option<List>> {
        Ok(self.list_by_slug(slug))
    }

    async fn list_lists(&self, user_id: Uuid) -> Result<Vec<List>> {
        // ---
        let mut lists: Vec<List> = self
            .store()
            .lists
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        lists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(lists)
    }

    async fn create_list(&self, new_list: NewList) -> Result<List> {
        // ---
        let mut store = self.store();
        if store.lists.iter().any(|l| l.slug == new_list.slug) {
            return Err(StoreError::UniqueViolation.into());
        }

        let list = List::new(new_list);
        store.lists.push(list.clone());
        Ok(list)
    }

    async fn update_list(&self, slug: &str, name: &str, new_slug: &str) -> Result<List> {
        // ---
        let mut store = self.store();
        if new_slug != slug && store.lists.iter().any(|l| l.slug == new_slug) {
            return Err(StoreError::UniqueViolation.into());
        }

        let list = store
            .lists
            .iter_mut()
            .find(|l| l.slug == slug)
            .ok_or_else(|| StoreError::Data("List not found".to_string()))?;

        list.name = name.to_string();
        list.slug = new_slug.to_string();
        list.updated_at = chrono::Utc::now();

        Ok(list.clone())
    }

    async fn delete_list(&self, slug: &str) -> Result<()> {
        // ---
        let mut store = self.store();
        if let Some(id) = store.lists.iter().find(|l| l.slug == slug).map(|l| l.id) {
            store.items.retain(|i| i.list_id != id);
            store.lists.retain(|l| l.id != id);
        }
        Ok(())
    }

    async fn list_items(&self, list_id: Uuid) -> Result<Vec<ListItem>> {
        // ---
        let mut items: Vec<ListItem> = self
            .store()
            .items
            .iter()
            .filter(|i| i.list_id == list_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(items)
    }

    async fn find_list_item(&self, item_id: Uuid) -> Result<Option<ListItem>> {
        Ok(self.store().items.iter().find(|i| i.id == item_id).cloned())
    }

    async fn create_list_item(&self, new_item: NewListItem) -> Result<ListItem> {
        // ---
        let item = ListItem::new(new_item);
        self.store().items.push(item.clone());
        Ok(item)
    }

    async fn delete_list_item(&self, item_id: Uuid) -> Result<()> {
        // ---
        self.store().items.retain(|i| i.id != item_id);
        Ok(())
    }
}

// ============================================================================
// Upstream stand-in
// ============================================================================

/// Serves a stand-in for the media API under `/3` and returns its base URL.
///
/// `/3/movie/550` returns a fixed record and `/3/movie/404404` a 404; any
/// other path echoes the path it was called with, the forwarded query
/// parameters (minus the API key) and whether the key was present.
pub async fn spawn_upstream() -> String {
    // ---
    let app = axum::Router::new()
        .route(
            "/3/movie/550",
            get(|| async { axum::Json(json!({ "id": 550, "title": "Fight Club" })) }),
        )
        .route(
            "/3/movie/404404",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    axum::Json(json!({ "status_message": "The resource could not be found." })),
                )
            }),
        )
        .fallback(
            |uri: Uri, Query(params): Query<Vec<(String, String)>>| async move {
                let keyed = params
                    .iter()
                    .any(|(name, value)| name == "api_key" && value == TEST_API_KEY);
                let forwarded: serde_json::Map<String, Value> = params
                    .into_iter()
                    .filter(|(name, _)| name != "api_key")
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect();

                axum::Json(json!({
                    "path": uri.path(),
                    "params": forwarded,
                    "keyed": keyed,
                }))
            },
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/3")
}

// ============================================================================
// Test Setup
// ============================================================================

pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub client: Client,
    pub repository: Arc<InMemoryRepository>,
}

impl TestServer {
    // ---
    pub async fn new() -> Self {
        Self::with_metrics(create_noop_metrics().unwrap()).await
    }

    pub async fn with_metrics(metrics: MetricsPtr) -> Self {
        // ---
        let upstream = spawn_upstream().await;
        Self::start(metrics, &upstream).await
    }

    /// A server whose upstream base URL is `upstream`.
    pub async fn start(metrics: MetricsPtr, upstream: &str) -> Self {
        // ---
        let repository = Arc::new(InMemoryRepository::default());
        let repository_ptr: RepositoryPtr = repository.clone();

        let sessions = SessionCodec::new(&SessionConfig {
            jwt_secret: TEST_SECRET.to_string(),
            cookie_domain: None,
            environment: Environment::Dev,
        })
        .unwrap();

        let media = MediaApiClient::new(
            &MediaApiConfig {
                api_key: TEST_API_KEY.to_string(),
                base_url: upstream.to_string(),
            },
            metrics.clone(),
        )
        .unwrap();

        // Lowest bcrypt cost keeps the suite fast.
        let state = AppState::new(
            repository_ptr,
            create_bcrypt_hasher(4),
            sessions,
            media,
            metrics,
        );
        let app = build_app(state).expect("Should be able to build app");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            repository,
        }
    }

    pub fn url(&self, path: &str) -> String {
        // ---
        format!("http://{}{}", self.addr, path)
    }

    /// Registers an account and returns the user JSON and session cookie.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> (Value, String) {
        // ---
        let res = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200, "registration should succeed");
        let cookie = session_cookie(&res).expect("registration should set a session cookie");
        (res.json().await.unwrap(), cookie)
    }

    /// Creates a list as the holder of `cookie` and returns its JSON.
    pub async fn create_list(&self, cookie: &str, name: &str) -> Value {
        // ---
        let res = self
            .client
            .post(self.url("/api/list/"))
            .header("cookie", cookie)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200, "list creation should succeed");
        res.json().await.unwrap()
    }
}

// ============================================================================
// Response helpers
// ============================================================================

/// All `Set-Cookie` values on `res`.
pub fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    // ---
    res.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The live session cookie on `res`, reduced to the `name=value` pair a
/// browser would send back.
pub fn session_cookie(res: &reqwest::Response) -> Option<String> {
    // ---
    set_cookies(res)
        .into_iter()
        .map(|c| c.split(';').next().unwrap_or_default().to_string())
        .find(|pair| pair.starts_with("moviesApi=") && pair != "moviesApi=deleted")
}

/// True when `res` tells the client to drop the session cookie.
pub fn clears_session(res: &reqwest::Response) -> bool {
    // ---
    set_cookies(res)
        .iter()
        .any(|c| c.starts_with("moviesApi=deleted") && c.contains("1970"))
}
