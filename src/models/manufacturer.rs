//! Car manufacturers.

use serde::Serialize;

use super::{Entity, SearchField};

/// A car manufacturer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manufacturer {
    /// Primary key.
    pub id: i64,
    /// Unique manufacturer name.
    pub name: String,
    /// Country of origin.
    pub country: String,
}

impl Entity for Manufacturer {
    const KIND: &'static str = "manufacturer";
    const SEARCH_FIELD: SearchField = SearchField::new("name");

    fn id(&self) -> i64 {
        self.id
    }
}
