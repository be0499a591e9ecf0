//! Security features.
//!
//! Password hashing for driver accounts.

mod password;

pub use password::{
    DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST, PASSWORD_MIN_LENGTH, hash_password,
    verify_password,
};
