//! User directory backed by the `drivers` table.

use crate::models::{Driver, NewDriver};
use crate::security::{DEFAULT_HASH_COST, PASSWORD_MIN_LENGTH, hash_password, verify_password};
use crate::storage::Database;
use crate::storage::sqlite::SqlEntity;
use crate::{Error, Result};
use rusqlite::{OptionalExtension, params};
use tracing::instrument;

const STORE: &str = "users";

/// Registers drivers and checks their credentials.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    db: Database,
    hash_cost: u32,
}

impl UserDirectory {
    /// Creates a directory over a database handle.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    /// Sets the bcrypt work factor used for new password hashes.
    #[must_use]
    pub const fn with_hash_cost(mut self, hash_cost: u32) -> Self {
        self.hash_cost = hash_cost;
        self
    }

    /// Returns the bcrypt work factor used for new password hashes.
    #[must_use]
    pub const fn hash_cost(&self) -> u32 {
        self.hash_cost
    }

    /// Registers a driver account.
    ///
    /// Usernames and license numbers are unique; the password is stored
    /// hashed and must be at least [`PASSWORD_MIN_LENGTH`] characters.
    #[instrument(skip(self, new_driver), fields(username = %new_driver.username))]
    pub fn register(&self, new_driver: &NewDriver) -> Result<Driver> {
        let username = new_driver.username.trim();
        let license_number = new_driver.license_number.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".to_string()));
        }
        if license_number.is_empty() {
            return Err(Error::InvalidInput(
                "license number must not be empty".to_string(),
            ));
        }
        if new_driver.password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(Error::InvalidInput(format!(
                "password must be at least {PASSWORD_MIN_LENGTH} characters"
            )));
        }

        let password_hash = hash_password(&new_driver.password, self.hash_cost)?;
        let id = self.db.with_conn(STORE, "register", |conn| {
            conn.execute(
                "INSERT INTO drivers (username, first_name, last_name, license_number, password_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    username,
                    new_driver.first_name.trim(),
                    new_driver.last_name.trim(),
                    license_number,
                    password_hash
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        tracing::info!(id, "Registered driver");
        Ok(Driver {
            id,
            username: username.to_string(),
            first_name: new_driver.first_name.trim().to_string(),
            last_name: new_driver.last_name.trim().to_string(),
            license_number: license_number.to_string(),
        })
    }

    /// Returns the driver when the username exists and the password matches.
    ///
    /// Unknown usernames still pay for one hash, so response time does not
    /// reveal which accounts exist.
    #[instrument(skip(self, password))]
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<Driver>> {
        let found = self.db.with_conn(STORE, "authenticate", |conn| {
            conn.query_row(
                "SELECT d.id, d.username, d.first_name, d.last_name, d.license_number, \
                 d.password_hash FROM drivers d WHERE d.username = ?1",
                params![username],
                |row| {
                    Ok((Driver::from_row(row)?, row.get::<_, String>(5)?))
                },
            )
            .optional()
        })?;

        let authenticated = match found {
            Some((driver, hash)) => verify_password(password, &hash)?.then_some(driver),
            None => {
                hash_password(password, self.hash_cost)?;
                None
            },
        };
        if authenticated.is_none() {
            tracing::debug!("Credentials rejected");
        }
        Ok(authenticated)
    }

    /// Looks up a driver account by id.
    pub fn find(&self, id: i64) -> Result<Option<Driver>> {
        let sql = format!("{} WHERE d.id = ?1", Driver::SELECT);
        self.db.with_conn(STORE, "find", |conn| {
            conn.query_row(&sql, params![id], Driver::from_row).optional()
        })
    }
}
