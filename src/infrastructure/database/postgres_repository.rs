use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    List, ListItem, NewList, NewListItem, NewUser, Repository, RepositoryPtr, StoreError, User,
    UserUpdate,
};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListRow {
    id: Uuid,
    slug: String,
    name: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ListRow> for List {
    fn from(r: ListRow) -> Self {
        List {
            id: r.id,
            slug: r.slug,
            name: r.name,
            user_id: r.user_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListItemRow {
    id: Uuid,
    list_id: Uuid,
    media_type: String,
    tmdb_id: i64,
    title: String,
    subtitle: Option<String>,
    poster_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ListItemRow> for ListItem {
    type Error = StoreError;

    fn try_from(r: ListItemRow) -> Result<Self, StoreError> {
        // ---
        let media_type = r
            .media_type
            .parse()
            .map_err(|err: anyhow::Error| StoreError::Data(err.to_string()))?;

        Ok(ListItem {
            id: r.id,
            list_id: r.list_id,
            media_type,
            tmdb_id: r.tmdb_id,
            title: r.title,
            subtitle: r.subtitle,
            poster_url: r.poster_url,
            created_at: r.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";
const LIST_COLUMNS: &str = "id, slug, name, user_id, created_at, updated_at";
const LIST_ITEM_COLUMNS: &str =
    "id, list_id, media_type, tmdb_id, title, subtitle, poster_url, created_at";

/// Maps driver errors onto [`StoreError`] so conflicts surface as 422s.
fn store_error(err: sqlx::Error) -> anyhow::Error {
    // ---
    let unique = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());

    if unique {
        StoreError::UniqueViolation.into()
    } else {
        tracing::error!("Database error: {err}");
        StoreError::Data(err.to_string()).into()
    }
}

pub fn create_postgres_repository(pool: PgPool) -> RepositoryPtr {
    // ---
    Arc::new(PostgresRepository::new(pool))
}

pub struct PostgresRepository {
    // ---
    pool: PgPool,
}

impl PostgresRepository {
    // ---
    pub fn new(pool: PgPool) -> Self {
        // ---
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Repository for PostgresRepository {
    // ---
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(User::from))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        // ---
        let user = User::new(new_user);

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(user)
    }

    async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> Result<User> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users
             SET name = $2, email = $3,
                 password_hash = COALESCE($4, password_hash),
                 updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(update.password_hash.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(User::from)
            .ok_or_else(|| StoreError::Data("User not found".to_string()).into())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        // ---
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn find_list(&self, slug: &str) -> Result<Option<List>> {
        // ---
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(List::from))
    }

    async fn list_lists(&self, user_id: Uuid) -> Result<Vec<List>> {
        // ---
        let rows = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE user_id = $1 ORDER BY name"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(List::from).collect())
    }

    async fn create_list(&self, new_list: NewList) -> Result<List> {
        // ---
        let list = List::new(new_list);

        sqlx::query(
            "INSERT INTO lists (id, slug, name, user_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(list.id)
        .bind(&list.slug)
        .bind(&list.name)
        .bind(list.user_id)
        .bind(list.created_at)
        .bind(list.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(list)
    }

    async fn update_list(&self, slug: &str, name: &str, new_slug: &str) -> Result<List> {
        // ---
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "UPDATE lists SET name = $2, slug = $3, updated_at = now()
             WHERE slug = $1
             RETURNING {LIST_COLUMNS}"
        ))
        .bind(slug)
        .bind(name)
        .bind(new_slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(List::from)
            .ok_or_else(|| StoreError::Data("List not found".to_string()).into())
    }

    async fn delete_list(&self, slug: &str) -> Result<()> {
        // ---
        sqlx::query("DELETE FROM lists WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn list_items(&self, list_id: Uuid) -> Result<Vec<ListItem>> {
        // ---
        let rows = sqlx::query_as::<_, ListItemRow>(&format!(
            "SELECT {LIST_ITEM_COLUMNS} FROM list_items WHERE list_id = $1 ORDER BY title"
        ))
        .bind(list_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter()
            .map(|row| ListItem::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn find_list_item(&self, item_id: Uuid) -> Result<Option<ListItem>> {
        // ---
        let row = sqlx::query_as::<_, ListItemRow>(&format!(
            "SELECT {LIST_ITEM_COLUMNS} FROM list_items WHERE id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(ListItem::try_from).transpose()?)
    }

    async fn create_list_item(&self, new_item: NewListItem) -> Result<ListItem> {
        // ---
        let item = ListItem::new(new_item);

        sqlx::query(
            "INSERT INTO list_items
                (id, list_id, media_type, tmdb_id, title, subtitle, poster_url, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(item.id)
        .bind(item.list_id)
        .bind(item.media_type.as_str())
        .bind(item.tmdb_id)
        .bind(&item.title)
        .bind(item.subtitle.as_deref())
        .bind(item.poster_url.as_deref())
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(item)
    }

    async fn delete_list_item(&self, item_id: Uuid) -> Result<()> {
        // ---
        sqlx::query("DELETE FROM list_items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(())
    }
}
