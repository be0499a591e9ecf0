//! Row mapping for entity types.

use crate::models::{Car, Driver, Entity, Manufacturer, SearchField};
use rusqlite::Row;

/// `SQLite` mapping for an [`Entity`].
///
/// `SELECT` must list the columns in the order `from_row` reads them and must
/// alias the entity table as `TABLE_ALIAS`, so that search fields resolve to
/// `alias.attribute`.
pub trait SqlEntity: Entity {
    /// Alias of the entity table inside `SELECT`.
    const TABLE_ALIAS: &'static str;
    /// Select statement without `WHERE` or `ORDER BY`.
    const SELECT: &'static str;
    /// Ordering applied to every listing.
    const ORDER_BY: &'static str;

    /// Builds the entity from a row produced by `SELECT`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Returns the qualified column for a search field.
    fn column(field: SearchField) -> String {
        format!("{}.{}", Self::TABLE_ALIAS, field.attribute())
    }
}

impl SqlEntity for Manufacturer {
    const TABLE_ALIAS: &'static str = "m";
    const SELECT: &'static str = "SELECT m.id, m.name, m.country FROM manufacturers m";
    const ORDER_BY: &'static str = "m.name, m.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            country: row.get(2)?,
        })
    }
}

impl SqlEntity for Car {
    const TABLE_ALIAS: &'static str = "c";
    const SELECT: &'static str = "SELECT c.id, c.model, c.manufacturer_id, m.name \
         FROM cars c JOIN manufacturers m ON m.id = c.manufacturer_id";
    const ORDER_BY: &'static str = "c.model, c.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            model: row.get(1)?,
            manufacturer_id: row.get(2)?,
            manufacturer_name: row.get(3)?,
        })
    }
}

impl SqlEntity for Driver {
    const TABLE_ALIAS: &'static str = "d";
    const SELECT: &'static str =
        "SELECT d.id, d.username, d.first_name, d.last_name, d.license_number FROM drivers d";
    const ORDER_BY: &'static str = "d.username, d.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            license_number: row.get(4)?,
        })
    }
}
