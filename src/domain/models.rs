//! Records owned by the persistence collaborator.
//!
//! All records serialise as camelCase JSON, which is the shape the browser
//! front-end consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    // ---
    pub id: Uuid,
    pub name: String,
    pub email: String,

    /// bcrypt digest of the account password. Never leaves the process.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    // ---
    pub fn new(new_user: NewUser) -> Self {
        // ---
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields required to create a [`User`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Account changes. `password_hash` is only replaced when present.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
}

/// A named collection of media, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    // ---
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl List {
    // ---
    pub fn new(new_list: NewList) -> Self {
        // ---
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slug: new_list.slug,
            name: new_list.name,
            user_id: new_list.user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Owner check against the user id carried in a session.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Fields required to create a [`List`].
#[derive(Debug, Clone)]
pub struct NewList {
    pub name: String,
    pub slug: String,
    pub user_id: Uuid,
}

/// A list together with its items, ordered by title.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWithItems {
    #[serde(flatten)]
    pub list: List,
    pub items: Vec<ListItem>,
}

/// Kind of upstream media a list item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
    Person,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
            MediaType::Person => "person",
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        // ---
        match value {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            "person" => Ok(MediaType::Person),
            other => Err(anyhow::anyhow!("Unknown media type `{other}`")),
        }
    }
}

/// One media entry inside a [`List`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    // ---
    pub id: Uuid,
    pub list_id: Uuid,
    pub media_type: MediaType,

    /// Identifier of the item in the upstream media database.
    pub tmdb_id: i64,

    pub title: String,
    pub subtitle: Option<String>,
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ListItem {
    // ---
    pub fn new(new_item: NewListItem) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            list_id: new_item.list_id,
            media_type: new_item.media_type,
            tmdb_id: new_item.tmdb_id,
            title: new_item.title,
            subtitle: new_item.subtitle,
            poster_url: new_item.poster_url,
            created_at: Utc::now(),
        }
    }
}

/// Fields required to create a [`ListItem`].
#[derive(Debug, Clone)]
pub struct NewListItem {
    pub list_id: Uuid,
    pub media_type: MediaType,
    pub tmdb_id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub poster_url: Option<String>,
}
