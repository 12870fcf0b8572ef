mod bcrypt_hasher;

pub use bcrypt_hasher::BcryptHasher;
use std::sync::Arc;

/// Work factor used for stored passwords.
pub const DEFAULT_COST: u32 = 10;

/// Creates a bcrypt password hasher with the given work factor.
pub fn create(cost: u32) -> crate::domain::PasswordHasherPtr {
    Arc::new(BcryptHasher::new(cost))
}
