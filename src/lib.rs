//! # Taxi Service
//!
//! Administration web application for a taxi service: drivers, cars and
//! manufacturers, with keyword search on every list page and a per-session
//! visit counter on the home page.
//!
//! ## Layers
//!
//! - **Services**: search filtering, visit counting, authentication
//! - **Storage**: `SQLite` entity store, session store and user directory
//! - **Rendering**: HTML templates with substitution and iteration blocks
//! - **Web**: `axum` router, extractors and handlers
//!
//! ## Example
//!
//! ```rust,ignore
//! use taxi_service::models::{Driver, Entity};
//! use taxi_service::services::search::{RequestParams, filter_entities};
//! use taxi_service::storage::{Collection, Database, EntityStore};
//!
//! let db = Database::in_memory()?;
//! let store = EntityStore::new(db);
//! let params = RequestParams::from_pairs([("search_query", "anna")]);
//! let drivers = store.fetch(&filter_entities(Collection::<Driver>::all(), Driver::SEARCH_FIELD, &params))?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod security;
pub mod services;
pub mod storage;
pub mod web;

pub use config::TaxiConfig;
pub use models::{Car, Driver, Entity, Manufacturer, SearchField};
pub use storage::{Collection, Database, EntityStore, SessionStore, UserDirectory};

/// Error type for taxi-service operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed CLI arguments, duplicate unique values, bad config values |
/// | `NotFound` | A requested driver, car or manufacturer does not exist |
/// | `OperationFailed` | `SQLite` errors, filesystem I/O, template or server failures |
/// | `Unauthorized` | A protected operation runs without an authenticated driver |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail
    /// - The config file cannot be read or parsed
    /// - A template references an unknown iteration collection
    /// - The HTTP listener cannot bind
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The request is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from an operation name and any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for taxi-service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// ```rust
/// use taxi_service::current_timestamp;
///
/// assert!(current_timestamp() > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::operation("open_sqlite", "disk full");
        assert_eq!(err.to_string(), "operation 'open_sqlite' failed: disk full");

        let err = Error::NotFound("car 7".to_string());
        assert_eq!(err.to_string(), "not found: car 7");
    }
}
