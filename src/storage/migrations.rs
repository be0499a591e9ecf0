//! Embedded `SQLite` schema migrations.
//!
//! Migrations are applied in order on every [`Database`](super::Database)
//! open. Each applied version is recorded in `schema_migrations`, so reopening
//! an existing database only runs what is pending.

use crate::{Error, Result};
use rusqlite::{Connection, params};

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Taxi entities",
        sql: "
            CREATE TABLE IF NOT EXISTS manufacturers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                country TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS drivers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                license_number TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cars (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                model TEXT NOT NULL,
                manufacturer_id INTEGER NOT NULL
                    REFERENCES manufacturers(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS car_drivers (
                car_id INTEGER NOT NULL REFERENCES cars(id) ON DELETE CASCADE,
                driver_id INTEGER NOT NULL REFERENCES drivers(id) ON DELETE CASCADE,
                PRIMARY KEY (car_id, driver_id)
            );
            CREATE INDEX IF NOT EXISTS idx_cars_manufacturer ON cars(manufacturer_id);
            CREATE INDEX IF NOT EXISTS idx_car_drivers_driver ON car_drivers(driver_id);
        ",
    },
    Migration {
        version: 2,
        description: "Server-side sessions",
        sql: "
            CREATE TABLE IF NOT EXISTS sessions (
                session_key TEXT PRIMARY KEY,
                data TEXT NOT NULL DEFAULT '{}',
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        ",
    },
];

/// Applies all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| Error::operation("create_migrations_table", e))?;

    let current = current_version(conn)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply(conn, migration)?;
    }

    Ok(())
}

/// Returns the version the schema reaches once every migration is applied.
#[must_use]
pub fn latest_version() -> i32 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Returns the highest applied migration version, or 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| Error::operation("read_schema_version", e))
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::operation("begin_migration", e))?;

    tx.execute_batch(migration.sql).map_err(|e| {
        Error::operation("apply_migration", format!("v{}: {e}", migration.version))
    })?;
    tx.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        params![
            migration.version,
            migration.description,
            i64::try_from(crate::current_timestamp()).unwrap_or(i64::MAX)
        ],
    )
    .map_err(|e| Error::operation("record_migration", e))?;

    tx.commit().map_err(|e| Error::operation("commit_migration", e))?;

    tracing::info!(
        version = migration.version,
        description = migration.description,
        "Applied schema migration"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_sequential() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(usize::try_from(migration.version).unwrap(), index + 1);
        }
    }

    #[test]
    fn test_run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let latest = MIGRATIONS.last().map_or(0, |m| m.version);
        assert_eq!(current_version(&conn).unwrap(), latest);

        let recorded: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(recorded, i64::from(latest));
    }
}
