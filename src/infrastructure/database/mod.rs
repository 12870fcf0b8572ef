mod postgres_repository;

pub use postgres_repository::create_postgres_repository;

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Delay between connection attempts at startup.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Opens the connection pool and applies pending migrations.
///
/// The database may still be starting when the gateway boots, so the
/// connection is retried up to `config.retry_count` times.
///
/// # Errors
/// Returns the last connection error once retries are exhausted, or any
/// migration failure.
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool> {
    // ---
    let attempts = config.retry_count.max(1);
    let mut attempt = 1;

    let pool = loop {
        let result = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await;

        match result {
            Ok(pool) => break pool,
            Err(err) if attempt < attempts => {
                tracing::warn!("Database connection attempt {attempt}/{attempts} failed: {err}");
                attempt += 1;
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(err) => {
                return Err(err).context(format!(
                    "Unable to connect to database after {attempts} attempts"
                ))
            }
        }
    };

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database ready after {attempt} attempt(s)");

    Ok(pool)
}
