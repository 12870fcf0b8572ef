use anyhow::Result;
use std::sync::Arc;

/// Abstraction for one-way password hashing.
#[async_trait::async_trait]
pub trait PasswordHasher: Send + Sync {
    // ---
    /// Produce a salted digest of `plaintext`.
    async fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check `plaintext` against a digest produced by [`PasswordHasher::hash`].
    async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool>;
}

/// Type alias for any backend that implements PasswordHasher.
pub type PasswordHasherPtr = Arc<dyn PasswordHasher>;
