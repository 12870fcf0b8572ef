use crate::domain::PasswordHasher;
use anyhow::{Context, Result};

/// bcrypt-backed [`PasswordHasher`].
///
/// Hashing is CPU-bound, so both operations run on the blocking pool.
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait::async_trait]
impl PasswordHasher for BcryptHasher {
    // ---
    async fn hash(&self, plaintext: &str) -> Result<String> {
        // ---
        let plaintext = plaintext.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .context("password hashing task failed")?
            .context("failed to hash password")
    }

    async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool> {
        // ---
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();

        tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest))
            .await
            .context("password verification task failed")?
            .context("failed to verify password")
    }
}
