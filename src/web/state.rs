//! Shared handler state.

use crate::TaxiConfig;
use crate::rendering::TemplateRenderer;
use crate::storage::{Database, EntityStore, SessionStore, UserDirectory};
use std::sync::Arc;
use std::time::Duration;

/// Everything a handler needs, cloned per request.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Manufacturers, cars, drivers and assignments.
    pub entities: EntityStore,
    /// Driver credentials.
    pub users: UserDirectory,
    /// Server-side sessions.
    pub sessions: SessionStore,
    /// Page renderer.
    pub renderer: Arc<TemplateRenderer>,
    /// Adds `Secure` to session cookies.
    pub secure_cookies: bool,
}

impl AppState {
    /// Builds state over one database with default session settings.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            entities: EntityStore::new(db.clone()),
            users: UserDirectory::new(db.clone()),
            sessions: SessionStore::new(db),
            renderer: Arc::new(TemplateRenderer::new()),
            secure_cookies: false,
        }
    }

    /// Builds state with the session and password settings from `config`.
    #[must_use]
    pub fn from_config(db: Database, config: &TaxiConfig) -> Self {
        let mut state = Self::new(db);
        state.sessions = state.sessions.with_ttl(config.session_ttl);
        state.users = state.users.with_hash_cost(config.password_hash_cost);
        state.secure_cookies = config.secure_cookies;
        state
    }

    /// Session lifetime, used for the cookie `Max-Age`.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        self.sessions.ttl()
    }
}
