mod database;
pub mod metrics;
mod password;

// Re-export the factory functions for easy access
pub use database::{connect_with_retry, create_postgres_repository};
pub use metrics::{create_noop_metrics, create_prom_metrics};
pub use password::{create as create_bcrypt_hasher, BcryptHasher, DEFAULT_COST as BCRYPT_COST};
