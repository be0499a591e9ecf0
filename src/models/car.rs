//! Cars.

use serde::Serialize;

use super::{Entity, SearchField};

/// A car, joined with the name of its manufacturer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Car {
    /// Primary key.
    pub id: i64,
    /// Model name.
    pub model: String,
    /// Manufacturer foreign key.
    pub manufacturer_id: i64,
    /// Manufacturer name.
    pub manufacturer_name: String,
}

impl Entity for Car {
    const KIND: &'static str = "car";
    const SEARCH_FIELD: SearchField = SearchField::new("model");

    fn id(&self) -> i64 {
        self.id
    }
}
