// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! Everything the gateway needs from its environment (signing secret,
//! upstream API key, cookie domain, database settings) is read here exactly
//! once at startup and handed to the components that need it. Failures are
//! treated as deployment errors rather than recoverable runtime conditions.

use anyhow::Result;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads a required environment variable.
///
/// Fails fast with `Missing required configuration: <KEY>` when the
/// variable is absent or blank.
macro_rules! required_env {
    // ---
    ($key:literal) => {
        std::env::var($key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!(concat!("Missing required configuration: ", $key)))?
    };
}

/// Reads an optional environment variable and attempts to parse it,
/// falling back to the provided default when missing or unparsable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor fails due to a missing
/// required environment variable.
macro_rules! assert_missing_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Missing required configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: server::ServerConfig,
    pub database: database::DatabaseConfig,
    pub session: session::SessionConfig,
    pub media_api: media_api::MediaApiConfig,
}

impl AppConfig {
    /// Loads and validates all application configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if any required configuration is missing or invalid.
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(Self {
            server: server::ServerConfig::from_env(),
            database: database::DatabaseConfig::from_env()?,
            session: session::SessionConfig::from_env()?,
            media_api: media_api::MediaApiConfig::from_env()?,
        })
    }
}

// ============================================================
// Server configuration
// ============================================================

mod server {
    // ---

    /// Listener and observability settings.
    #[derive(Debug, Clone)]
    pub struct ServerConfig {
        /// Address the HTTP listener binds to. Defaults to `127.0.0.1:8787`.
        pub bind_addr: String,

        /// Metrics back-end: `prom` or anything else for no-op.
        pub metrics_type: String,
    }

    impl ServerConfig {
        pub fn from_env() -> Self {
            // ---
            Self {
                bind_addr: std::env::var("MOVIES_API_BIND_ADDR")
                    .unwrap_or_else(|_| "127.0.0.1:8787".to_string()),
                metrics_type: std::env::var("MOVIES_API_METRICS_TYPE")
                    .unwrap_or_else(|_| "noop".to_string()),
            }
        }

        /// True when the Prometheus back-end was requested.
        pub fn prometheus_enabled(&self) -> bool {
            // ---
            self.metrics_type == "prom"
        }
    }
}
pub use server::ServerConfig;

// ============================================================
// Database configuration
// ============================================================

mod database {
    // ---
    use super::*;

    /// Database-related configuration derived from environment variables.
    #[derive(Debug, Clone)]
    pub struct DatabaseConfig {
        /// PostgreSQL connection string.
        pub database_url: String,

        /// Number of retry attempts when initializing the database connection. Defaults to 50.
        pub retry_count: u32,

        /// Maximum time to wait when acquiring a connection from the pool. Defaults to 30 seconds.
        pub acquire_timeout: Duration,

        /// Minimum number of connections to keep in the pool, even when idle. Defaults to 2.
        pub min_connections: u32,

        /// Maximum number of connections to be open concurrently. Defaults to 15
        pub max_connections: u32,
    }

    impl DatabaseConfig {
        /// Builds a [`DatabaseConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if `DATABASE_URL` is missing.
        pub fn from_env() -> Result<Self> {
            // ---
            let database_url = required_env!("DATABASE_URL");
            let retry_count = optional_env_parse!("MOVIES_API_DB_RETRY_COUNT", u32, 50);
            let acquire_timeout_secs =
                optional_env_parse!("MOVIES_API_DB_ACQUIRE_TIMEOUT_SEC", u64, 30);
            let min_connections = optional_env_parse!("MOVIES_API_DB_MIN_CONNECTIONS", u32, 2);
            let max_connections = optional_env_parse!("MOVIES_API_DB_MAX_CONNECTIONS", u32, 15);

            Ok(Self {
                database_url,
                retry_count,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
                min_connections,
                max_connections,
            })
        }
    }
}
pub use database::DatabaseConfig;

// ============================================================
// Session configuration
// ============================================================

mod session {
    // ---
    use super::*;

    /// Deployment environment. Only `dev` relaxes the cookie domain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Environment {
        Dev,
        Prod,
    }

    impl std::str::FromStr for Environment {
        type Err = anyhow::Error;

        fn from_str(value: &str) -> Result<Self> {
            // ---
            match value.trim() {
                "dev" => Ok(Environment::Dev),
                "prod" => Ok(Environment::Prod),
                other => Err(anyhow::anyhow!(
                    "Invalid ENVIRONMENT value `{other}` (expected `dev` or `prod`)"
                )),
            }
        }
    }

    /// Signed-cookie session settings.
    ///
    /// The secret is fixed for the life of the process; there is no
    /// runtime rotation.
    #[derive(Clone)]
    pub struct SessionConfig {
        /// Symmetric secret used to sign session tokens.
        pub jwt_secret: String,

        /// `Domain` attribute for the session cookie. Required outside `dev`.
        pub cookie_domain: Option<String>,

        pub environment: Environment,
    }

    // Keeps the secret out of logs.
    impl std::fmt::Debug for SessionConfig {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SessionConfig")
                .field("jwt_secret", &"<redacted>")
                .field("cookie_domain", &self.cookie_domain)
                .field("environment", &self.environment)
                .finish()
        }
    }

    impl SessionConfig {
        /// Builds a [`SessionConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if `JWT_SECRET` is missing, `ENVIRONMENT` is not
        /// recognised, or `COOKIE_DOMAIN` is missing outside `dev`.
        pub fn from_env() -> Result<Self> {
            // ---
            let jwt_secret = required_env!("JWT_SECRET");

            let environment = match std::env::var("ENVIRONMENT") {
                Ok(value) => value.parse()?,
                Err(_) => Environment::Prod,
            };

            let cookie_domain = match environment {
                Environment::Dev => None,
                Environment::Prod => Some(required_env!("COOKIE_DOMAIN")),
            };

            Ok(Self {
                jwt_secret,
                cookie_domain,
                environment,
            })
        }
    }
}
pub use session::{Environment, SessionConfig};

// ============================================================
// Media API configuration
// ============================================================

mod media_api {
    // ---
    use super::*;

    /// Upstream media database settings.
    #[derive(Clone)]
    pub struct MediaApiConfig {
        /// Key appended to every upstream request as `api_key`.
        pub api_key: String,

        /// Root URL of the upstream API, without a trailing slash.
        pub base_url: String,
    }

    impl std::fmt::Debug for MediaApiConfig {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MediaApiConfig")
                .field("api_key", &"<redacted>")
                .field("base_url", &self.base_url)
                .finish()
        }
    }

    impl MediaApiConfig {
        /// Builds a [`MediaApiConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if `MOVIE_API_KEY` is missing or blank.
        pub fn from_env() -> Result<Self> {
            // ---
            let api_key = required_env!("MOVIE_API_KEY");
            let base_url = std::env::var("MOVIE_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());

            Ok(Self { api_key, base_url })
        }
    }
}
pub use media_api::MediaApiConfig;

// ============================================================
// Tests
// ============================================================
