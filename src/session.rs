//! Signed-cookie sessions.
//!
//! A session is an HS256 token carrying `{userId, email}` with a fixed
//! 10-day expiry, stored in the `moviesApi` cookie. There is no server-side
//! session store: a session ends when the cookie is cleared or the token
//! expires. Every verification failure is reported as "no session".

use crate::config::SessionConfig;
use anyhow::{ensure, Result};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

// ---

/// Name of the session cookie.
pub const COOKIE_NAME: &str = "moviesApi";

/// Session lifetime in days.
const SESSION_TTL_DAYS: i64 = 10;

/// Value written into the cookie when clearing it.
const CLEARED_VALUE: &str = "deleted";

// ---

/// Identity claims carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub user_id: String,
    pub email: String,
}

/// On-the-wire token claims. Identity fields are optional so a token that
/// lacks them decodes and is then rejected, rather than failing inside
/// the JWT library.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    iat: i64,
    exp: i64,
}

// ---

/// Issues, verifies and clears session cookies.
///
/// Built once at startup from [`SessionConfig`]; the signing secret is
/// never rotated while the process runs.
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    domain: Option<String>,
}

impl SessionCodec {
    // ---

    /// # Errors
    /// Returns an error if the signing secret is empty.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        // ---
        ensure!(
            !config.jwt_secret.is_empty(),
            "Session signing secret must not be empty"
        );

        let secret = config.jwt_secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            domain: config.cookie_domain.clone(),
        })
    }

    /// Signs `payload` and serialises it as a `Set-Cookie` value.
    pub fn issue(&self, payload: &SessionPayload) -> Result<String> {
        // ---
        self.issue_at(payload, Utc::now())
    }

    /// Like [`SessionCodec::issue`], with an explicit issue time. The token
    /// expires [`SESSION_TTL_DAYS`] after `issued_at`.
    pub fn issue_at(&self, payload: &SessionPayload, issued_at: DateTime<Utc>) -> Result<String> {
        // ---
        let expires_at = issued_at + Duration::days(SESSION_TTL_DAYS);

        let claims = Claims {
            user_id: Some(payload.user_id.clone()),
            email: Some(payload.email.clone()),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;

        let mut cookie = self.cookie(token);
        cookie.set_max_age(time::Duration::days(SESSION_TTL_DAYS));

        Ok(cookie.to_string())
    }

    /// Extracts and verifies the session from a `Cookie` request header.
    ///
    /// Returns `None` when the header or cookie is missing, the token is
    /// malformed, its signature does not match, it has expired, or it lacks
    /// a user id or email.
    pub fn verify(&self, cookie_header: Option<&str>) -> Option<SessionPayload> {
        // ---
        let cookie = Cookie::split_parse(cookie_header?)
            .filter_map(|cookie| cookie.ok())
            .find(|cookie| cookie.name() == COOKIE_NAME)?;

        let claims = match decode::<Claims>(cookie.value(), &self.decoding, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => {
                tracing::debug!("Rejected session token: {err}");
                return None;
            }
        };

        match (claims.user_id, claims.email) {
            (Some(user_id), Some(email)) if !user_id.is_empty() && !email.is_empty() => {
                Some(SessionPayload { user_id, email })
            }
            _ => {
                tracing::debug!("Session token is missing identity claims");
                None
            }
        }
    }

    /// A `Set-Cookie` value that makes the client drop the session cookie.
    pub fn clear(&self) -> String {
        // ---
        let mut cookie = self.cookie(CLEARED_VALUE.to_string());
        cookie.set_expires(time::OffsetDateTime::UNIX_EPOCH);

        cookie.to_string()
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        // ---
        let mut cookie = Cookie::build((COOKIE_NAME, value))
            .secure(true)
            .http_only(true)
            .path("/")
            .same_site(SameSite::None)
            .build();

        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }

        cookie
    }
}
