//! Session backend trait.

use crate::Result;
use serde_json::Value;
use std::fmt;

/// Opaque identifier of a server-side session, carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Maximum accepted key length.
    pub const MAX_LEN: usize = 64;

    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Accepts a client-supplied key if it is non-empty, at most
    /// [`Self::MAX_LEN`] characters and ASCII alphanumeric.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw.bytes().all(|b| b.is_ascii_alphanumeric());
        valid.then(|| Self(raw.to_string()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side session storage.
///
/// Values are JSON. Expired sessions behave exactly like missing ones. Every
/// method is atomic on its own; a `get` followed by a `set` is not.
pub trait SessionBackend: Send + Sync {
    /// Creates an empty session and returns its key.
    fn create(&self) -> Result<SessionKey>;

    /// Returns true if the session exists and has not expired.
    fn exists(&self, key: &SessionKey) -> Result<bool>;

    /// Reads a value. `None` when the session or the value is absent.
    fn get(&self, key: &SessionKey, name: &str) -> Result<Option<Value>>;

    /// Writes a value and extends the session expiry.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if the session
    /// does not exist.
    fn set(&self, key: &SessionKey, name: &str, value: Value) -> Result<()>;

    /// Moves the session data to a fresh key and returns it.
    fn cycle_key(&self, key: &SessionKey) -> Result<SessionKey>;

    /// Deletes the session.
    fn delete(&self, key: &SessionKey) -> Result<()>;
}
