//! `SQLite` entity store.
//!
//! Evaluates [`Collection`]s and handles the few writes the application needs:
//! registering manufacturers and cars, and assigning drivers to cars. Drivers
//! are registered through the [`UserDirectory`](super::UserDirectory) because
//! they carry credentials.

use crate::models::{Car, Driver, Entity, Manufacturer};
use crate::storage::sqlite::{SqlEntity, UNICODE_LOWER, contains_pattern};
use crate::storage::{Collection, Database};
use crate::{Error, Result};
use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::instrument;

const STORE: &str = "entities";

/// Entity persistence backed by the shared [`Database`].
#[derive(Debug, Clone)]
pub struct EntityStore {
    db: Database,
}

impl EntityStore {
    /// Creates a store over a database handle.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the unfiltered collection of `E`.
    #[must_use]
    pub const fn query<E: SqlEntity>(&self) -> Collection<E> {
        Collection::all()
    }

    /// Evaluates a collection.
    ///
    /// Each filter becomes `unicode_lower(column) LIKE unicode_lower(pattern)
    /// ESCAPE '\'` with wildcards in the value escaped, so values match as
    /// literal substrings regardless of case, accented letters included.
    #[instrument(skip(self, collection), fields(kind = E::KIND, filters = collection.filters().len()))]
    pub fn fetch<E: SqlEntity>(&self, collection: &Collection<E>) -> Result<Vec<E>> {
        let mut sql = String::from(E::SELECT);
        let mut values = Vec::with_capacity(collection.filters().len());

        for (index, filter) in collection.filters().iter().enumerate() {
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!(
                "{UNICODE_LOWER}({}) LIKE {UNICODE_LOWER}(?{}) ESCAPE '\\'",
                E::column(filter.field),
                index + 1
            ));
            values.push(contains_pattern(&filter.value));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(E::ORDER_BY);

        let rows = self.db.with_conn(STORE, "fetch", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), E::from_row)?;
            rows.collect::<rusqlite::Result<Vec<E>>>()
        })?;

        tracing::debug!(rows = rows.len(), "Fetched collection");
        Ok(rows)
    }

    /// Returns the entity with the given id.
    pub fn get<E: SqlEntity>(&self, id: i64) -> Result<Option<E>> {
        let sql = format!("{} WHERE {}.id = ?1", E::SELECT, E::TABLE_ALIAS);
        self.db.with_conn(STORE, "get", |conn| {
            conn.query_row(&sql, params![id], E::from_row).optional()
        })
    }

    /// Returns the entity with the given id, or [`Error::NotFound`].
    pub fn require<E: SqlEntity>(&self, id: i64) -> Result<E> {
        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("{} {id}", E::KIND)))
    }

    /// Counts all stored entities of type `E`.
    pub fn count<E: SqlEntity>(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM ({})", E::SELECT);
        let count: i64 = self
            .db
            .with_conn(STORE, "count", |conn| conn.query_row(&sql, [], |row| row.get(0)))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Registers a manufacturer. Names are unique.
    #[instrument(skip(self))]
    pub fn insert_manufacturer(&self, name: &str, country: &str) -> Result<Manufacturer> {
        let name = non_blank("manufacturer name", name)?;
        let country = non_blank("country", country)?;

        let id = self.db.with_conn(STORE, "insert_manufacturer", |conn| {
            conn.execute(
                "INSERT INTO manufacturers (name, country) VALUES (?1, ?2)",
                params![name, country],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        tracing::info!(id, "Registered manufacturer");
        Ok(Manufacturer {
            id,
            name: name.to_string(),
            country: country.to_string(),
        })
    }

    /// Looks up a manufacturer by its exact name.
    pub fn manufacturer_by_name(&self, name: &str) -> Result<Option<Manufacturer>> {
        let sql = format!("{} WHERE m.name = ?1", Manufacturer::SELECT);
        self.db.with_conn(STORE, "manufacturer_by_name", |conn| {
            conn.query_row(&sql, params![name], Manufacturer::from_row)
                .optional()
        })
    }

    /// Registers a car made by an existing manufacturer.
    #[instrument(skip(self))]
    pub fn insert_car(&self, model: &str, manufacturer_id: i64) -> Result<Car> {
        let model = non_blank("car model", model)?;
        let manufacturer = self.require::<Manufacturer>(manufacturer_id)?;

        let id = self.db.with_conn(STORE, "insert_car", |conn| {
            conn.execute(
                "INSERT INTO cars (model, manufacturer_id) VALUES (?1, ?2)",
                params![model, manufacturer.id],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        tracing::info!(id, "Registered car");
        Ok(Car {
            id,
            model: model.to_string(),
            manufacturer_id: manufacturer.id,
            manufacturer_name: manufacturer.name,
        })
    }

    /// Assigns the driver to the car, or removes the assignment if it exists.
    ///
    /// Returns `true` when the driver is assigned after the call. The check
    /// and the write happen under one connection lock.
    #[instrument(skip(self))]
    pub fn toggle_assignment(&self, car_id: i64, driver_id: i64) -> Result<bool> {
        self.require::<Car>(car_id)?;
        self.require::<Driver>(driver_id)?;

        let assigned = self.db.with_conn(STORE, "toggle_assignment", |conn| {
            let removed = conn.execute(
                "DELETE FROM car_drivers WHERE car_id = ?1 AND driver_id = ?2",
                params![car_id, driver_id],
            )?;
            if removed > 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO car_drivers (car_id, driver_id) VALUES (?1, ?2)",
                params![car_id, driver_id],
            )?;
            Ok(true)
        })?;

        tracing::info!(assigned, "Toggled car assignment");
        Ok(assigned)
    }

    /// Cars assigned to a driver, ordered like the car list.
    pub fn cars_for_driver(&self, driver_id: i64) -> Result<Vec<Car>> {
        let sql = format!(
            "{} JOIN car_drivers cd ON cd.car_id = c.id WHERE cd.driver_id = ?1 ORDER BY {}",
            Car::SELECT,
            Car::ORDER_BY
        );
        self.db.with_conn(STORE, "cars_for_driver", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![driver_id], Car::from_row)?;
            rows.collect()
        })
    }

    /// Drivers assigned to a car, ordered like the driver list.
    pub fn drivers_for_car(&self, car_id: i64) -> Result<Vec<Driver>> {
        let sql = format!(
            "{} JOIN car_drivers cd ON cd.driver_id = d.id WHERE cd.car_id = ?1 ORDER BY {}",
            Driver::SELECT,
            Driver::ORDER_BY
        );
        self.db.with_conn(STORE, "drivers_for_car", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![car_id], Driver::from_row)?;
            rows.collect()
        })
    }
}

fn non_blank<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}
