//! Data models for the taxi service.
//!
//! Entities are owned by the storage layer; this module only describes their
//! shape and the single attribute each list page searches on.

mod car;
mod driver;
mod manufacturer;
mod search;

pub use car::Car;
pub use driver::{Driver, NewDriver};
pub use manufacturer::Manufacturer;
pub use search::SearchField;

/// A persisted record type that can be listed and searched.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Singular, lowercase name used in logs, metrics and routes.
    const KIND: &'static str;

    /// The attribute list views filter this entity by.
    const SEARCH_FIELD: SearchField;

    /// Returns the primary key.
    fn id(&self) -> i64;
}
