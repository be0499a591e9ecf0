//! Shared `SQLite` infrastructure for the storage backends.
//!
//! The entity store, the session store and the user directory all share one
//! [`Database`](crate::storage::Database) handle; this module holds the pieces
//! they have in common.
//!
//! ## Module Structure
//!
//! - [`connection`]: lock acquisition with poison recovery and pragma setup
//! - [`sql`]: LIKE escaping and substring pattern building
//! - [`entity_row`]: row mapping and select statements per entity type
//! - [`metrics`]: operation counters and latency histograms

mod connection;
mod entity_row;
mod metrics;
mod sql;

pub use connection::{UNICODE_LOWER, acquire_lock, configure_connection};
pub use entity_row::SqlEntity;
pub use self::metrics::record_operation_metrics;
pub use sql::{contains_pattern, escape_like_wildcards};
