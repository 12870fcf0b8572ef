mod metrics;
mod models;
mod password;
mod repository;

// Publicly expose the Metrics abstraction
pub use metrics::{Metrics, MetricsPtr};

// Persistence and hashing collaborators
pub use password::{PasswordHasher, PasswordHasherPtr};
pub use repository::{Repository, RepositoryPtr, StoreError};

pub use models::{
    List, ListItem, ListWithItems, MediaType, NewList, NewListItem, NewUser, User, UserUpdate,
};
