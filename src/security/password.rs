//! Password hashing with bcrypt.
//!
//! Stored hashes use the modular crypt format (`$2b$<cost>$<salt+digest>`),
//! so the cost a hash was made with is read back from the hash itself.

use crate::{Error, Result};

/// Minimum accepted password length.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Work factor used when none is configured.
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts.
pub const MIN_HASH_COST: u32 = 4;

/// Highest work factor bcrypt accepts.
pub const MAX_HASH_COST: u32 = 31;

/// Hashes a password with a fresh random salt.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] when `cost` is outside
/// [`MIN_HASH_COST`]..=[`MAX_HASH_COST`].
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).map_err(|e| Error::operation("hash_password", e))
}

/// Checks a password against a stored hash.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] when the stored hash is malformed.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    bcrypt::verify(password, stored).map_err(|e| Error::operation("verify_password", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("Test1234", MIN_HASH_COST).unwrap();
        assert!(hash.starts_with("$2b$04$"));
        assert!(verify_password("Test1234", &hash).unwrap());
        assert!(!verify_password("test1234", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(
            hash_password("same-password", MIN_HASH_COST).unwrap(),
            hash_password("same-password", MIN_HASH_COST).unwrap()
        );
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", ""),
            Err(Error::OperationFailed { .. })
        ));
        assert!(verify_password("x", "sha256$1$salt$digest").is_err());
        assert!(verify_password("x", "$2b$04$short").is_err());
    }

    #[test]
    fn test_cost_out_of_range() {
        assert!(hash_password("pw", MIN_HASH_COST - 1).is_err());
        assert!(hash_password("pw", MAX_HASH_COST + 1).is_err());
    }
}
