//! `SQLite` session store.

use crate::storage::{Database, SessionBackend, SessionKey};
use crate::{Error, Result, current_timestamp};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use std::time::Duration;

const STORE: &str = "sessions";

/// Two weeks.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Sessions stored as JSON objects in the `sessions` table.
#[derive(Debug, Clone)]
pub struct SessionStore {
    db: Database,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a store with the default two-week lifetime.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Sets the session lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the session lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Deletes expired sessions and returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = now_secs();
        let removed = self.db.with_conn(STORE, "purge_expired", |conn| {
            conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])
        })?;
        tracing::info!(removed, "Purged expired sessions");
        Ok(removed)
    }

    fn expires_at(&self) -> i64 {
        now_secs().saturating_add(i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX))
    }
}

impl SessionBackend for SessionStore {
    fn create(&self) -> Result<SessionKey> {
        let key = SessionKey::generate();
        let expires_at = self.expires_at();
        self.db.with_conn(STORE, "create", |conn| {
            conn.execute(
                "INSERT INTO sessions (session_key, data, expires_at) VALUES (?1, '{}', ?2)",
                params![key.as_str(), expires_at],
            )
        })?;
        tracing::debug!("Created session");
        Ok(key)
    }

    fn exists(&self, key: &SessionKey) -> Result<bool> {
        self.db.with_conn(STORE, "exists", |conn| {
            Ok(load(conn, key)?.is_some())
        })
    }

    fn get(&self, key: &SessionKey, name: &str) -> Result<Option<Value>> {
        let data = self
            .db
            .with_conn(STORE, "get", |conn| load(conn, key))?;
        Ok(data.and_then(|mut map| map.remove(name)))
    }

    fn set(&self, key: &SessionKey, name: &str, value: Value) -> Result<()> {
        let expires_at = self.expires_at();
        let updated = self.db.with_conn(STORE, "set", |conn| {
            let Some(mut data) = load(conn, key)? else {
                return Ok(false);
            };
            data.insert(name.to_string(), value);
            store(conn, key, &data, expires_at)?;
            Ok(true)
        })?;

        if updated {
            Ok(())
        } else {
            Err(Error::NotFound("session".to_string()))
        }
    }

    fn cycle_key(&self, key: &SessionKey) -> Result<SessionKey> {
        let new_key = SessionKey::generate();
        let expires_at = self.expires_at();
        let moved = self.db.with_conn(STORE, "cycle_key", |conn| {
            conn.execute(
                "UPDATE sessions SET session_key = ?1, expires_at = ?2
                 WHERE session_key = ?3 AND expires_at > ?4",
                params![new_key.as_str(), expires_at, key.as_str(), now_secs()],
            )
        })?;

        if moved == 0 {
            return Err(Error::NotFound("session".to_string()));
        }
        tracing::debug!("Cycled session key");
        Ok(new_key)
    }

    fn delete(&self, key: &SessionKey) -> Result<()> {
        self.db.with_conn(STORE, "delete", |conn| {
            conn.execute(
                "DELETE FROM sessions WHERE session_key = ?1",
                params![key.as_str()],
            )
        })?;
        Ok(())
    }
}

fn now_secs() -> i64 {
    i64::try_from(current_timestamp()).unwrap_or(i64::MAX)
}

/// Reads an unexpired session. Corrupt data reads as an empty object.
fn load(conn: &Connection, key: &SessionKey) -> rusqlite::Result<Option<Map<String, Value>>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT data FROM sessions WHERE session_key = ?1 AND expires_at > ?2",
            params![key.as_str(), now_secs()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(raw.map(|raw| match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            tracing::warn!("Discarding unreadable session data");
            Map::new()
        },
    }))
}

fn store(
    conn: &Connection,
    key: &SessionKey,
    data: &Map<String, Value>,
    expires_at: i64,
) -> rusqlite::Result<()> {
    // Serializing a map of JSON values cannot fail.
    let raw = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
    conn.execute(
        "UPDATE sessions SET data = ?1, expires_at = ?2 WHERE session_key = ?3",
        params![raw, expires_at, key.as_str()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sessions() -> SessionStore {
        SessionStore::new(Database::in_memory().unwrap())
    }

    #[test]
    fn test_set_then_get() {
        let store = sessions();
        let key = store.create().unwrap();

        assert!(store.exists(&key).unwrap());
        assert_eq!(store.get(&key, "num_visits").unwrap(), None);

        store.set(&key, "num_visits", json!(3)).unwrap();
        assert_eq!(store.get(&key, "num_visits").unwrap(), Some(json!(3)));

        store.set(&key, "num_visits", json!(4)).unwrap();
        assert_eq!(store.get(&key, "num_visits").unwrap(), Some(json!(4)));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = sessions();
        let a = store.create().unwrap();
        let b = store.create().unwrap();

        store.set(&a, "num_visits", json!(5)).unwrap();
        assert_eq!(store.get(&b, "num_visits").unwrap(), None);
    }

    #[test]
    fn test_unknown_session() {
        let store = sessions();
        let key = SessionKey::generate();

        assert!(!store.exists(&key).unwrap());
        assert_eq!(store.get(&key, "x").unwrap(), None);
        assert!(matches!(store.set(&key, "x", json!(1)), Err(Error::NotFound(_))));
        assert!(matches!(store.cycle_key(&key), Err(Error::NotFound(_))));
        store.delete(&key).unwrap();
    }

    #[test]
    fn test_cycle_key_preserves_data() {
        let store = sessions();
        let old = store.create().unwrap();
        store.set(&old, "num_visits", json!(2)).unwrap();

        let new = store.cycle_key(&old).unwrap();
        assert_ne!(old, new);
        assert!(!store.exists(&old).unwrap());
        assert_eq!(store.get(&new, "num_visits").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_expired_sessions_are_absent_and_purged() {
        let store = sessions().with_ttl(Duration::ZERO);
        let key = store.create().unwrap();

        assert!(!store.exists(&key).unwrap());
        assert!(matches!(store.set(&key, "x", json!(1)), Err(Error::NotFound(_))));
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn test_delete() {
        let store = sessions();
        let key = store.create().unwrap();
        store.delete(&key).unwrap();
        assert!(!store.exists(&key).unwrap());
    }
}
