//! Shared `SQLite` database handle.

use crate::storage::migrations;
use crate::storage::sqlite::{acquire_lock, configure_connection, record_operation_metrics};
use crate::{Error, Result};
use rusqlite::{Connection, ErrorCode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Handle to the application database.
///
/// Cloning is cheap: clones share one connection behind a mutex, so the
/// entity store, the session store and the user directory always see the same
/// data (including for in-memory databases used in tests).
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens (or creates) a database file and applies pending migrations.
    ///
    /// Parent directories are created when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::operation("create_database_dir", e))?;
        }

        let conn = Connection::open(&path).map_err(|e| Error::operation("open_sqlite", e))?;
        Self::from_connection(conn, Some(path))
    }

    /// Opens a private in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::operation("open_sqlite_in_memory", e))?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        configure_connection(&conn)?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the applied schema version.
    pub fn schema_version(&self) -> Result<i32> {
        let conn = acquire_lock(&self.conn);
        migrations::current_version(&conn)
    }

    /// Runs `f` while holding the connection lock and records operation metrics.
    ///
    /// Constraint violations (duplicate usernames, unknown foreign keys) map to
    /// [`Error::InvalidInput`]; every other `SQLite` error maps to
    /// [`Error::OperationFailed`] named after `operation`.
    pub(crate) fn with_conn<T>(
        &self,
        store: &'static str,
        operation: &'static str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            f(&conn)
        };

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(store, operation, start, status);

        result.map_err(|e| map_sqlite_error(operation, e))
    }
}

fn map_sqlite_error(operation: &str, error: rusqlite::Error) -> Error {
    match &error {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::InvalidInput(
                message
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string()),
            )
        },
        _ => Error::operation(operation, error),
    }
}
