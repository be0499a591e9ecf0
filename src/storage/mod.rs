//! Storage layer.
//!
//! Everything lives in one `SQLite` database shared through a [`Database`]
//! handle:
//! - **Entities**: manufacturers, cars, drivers and car assignments
//! - **Users**: driver credentials
//! - **Sessions**: server-side session data keyed by the session cookie

// Dropping the connection guard a few statements early buys nothing.
#![allow(clippy::significant_drop_tightening)]

mod collection;
mod database;
mod entities;
pub mod migrations;
mod sessions;
pub mod sqlite;
mod traits;
mod users;

pub use collection::{Collection, SubstringFilter};
pub use database::Database;
pub use entities::EntityStore;
pub use sessions::{DEFAULT_SESSION_TTL, SessionStore};
pub use traits::{SessionBackend, SessionKey};
pub use users::UserDirectory;
