use super::models::{List, ListItem, NewList, NewListItem, NewUser, User, UserUpdate};
use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

/// Failures raised by a [`Repository`] implementation.
///
/// Implementations wrap these in `anyhow::Error`; the response builder
/// downcasts to tell conflicts apart from other data errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (user email, list slug) is already taken.
    #[error("unique constraint violated")]
    UniqueViolation,

    /// Any other persistence failure, with a message safe to show callers.
    #[error("{0}")]
    Data(String),
}

/// Abstraction for user, list and list item persistence.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    // ---
    /// Get user by email address.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by ID.
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Create a new user. Duplicate emails raise [`StoreError::UniqueViolation`].
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Update an existing user's details.
    async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> Result<User>;

    /// Delete a user together with their lists and list items.
    async fn delete_user(&self, user_id: Uuid) -> Result<()>;

    /// Get a list by its slug.
    async fn find_list(&self, slug: &str) -> Result<Option<List>>;

    /// Get all lists owned by a user, ordered by name.
    async fn list_lists(&self, user_id: Uuid) -> Result<Vec<List>>;

    /// Create a new list. Duplicate slugs raise [`StoreError::UniqueViolation`].
    async fn create_list(&self, new_list: NewList) -> Result<List>;

    /// Rename a list, replacing its slug.
    async fn update_list(&self, slug: &str, name: &str, new_slug: &str) -> Result<List>;

    /// Delete a list and its items.
    async fn delete_list(&self, slug: &str) -> Result<()>;

    /// Get the items of a list, ordered by title.
    async fn list_items(&self, list_id: Uuid) -> Result<Vec<ListItem>>;

    /// Get a list item by ID.
    async fn find_list_item(&self, item_id: Uuid) -> Result<Option<ListItem>>;

    /// Add an item to a list.
    async fn create_list_item(&self, new_item: NewListItem) -> Result<ListItem>;

    /// Remove a list item.
    async fn delete_list_item(&self, item_id: Uuid) -> Result<()>;
}

/// Type alias for any backend that implements Repository.
pub type RepositoryPtr = Arc<dyn Repository>;
