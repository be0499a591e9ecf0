//! Drivers.
//!
//! Drivers double as the user accounts of the application: the user directory
//! authenticates against the same table.

use serde::Serialize;

use super::{Entity, SearchField};

/// A driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Driver {
    /// Primary key.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique driving license number.
    pub license_number: String,
}

impl Driver {
    /// Returns `first last`, falling back to the username when both are blank.
    #[must_use]
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let trimmed = full.trim();
        if trimmed.is_empty() {
            self.username.clone()
        } else {
            trimmed.to_string()
        }
    }
}

impl Entity for Driver {
    const KIND: &'static str = "driver";
    const SEARCH_FIELD: SearchField = SearchField::new("username");

    fn id(&self) -> i64 {
        self.id
    }
}

/// Input for registering a driver.
#[derive(Debug, Clone, Default)]
pub struct NewDriver {
    /// Unique login name.
    pub username: String,
    /// Plain-text password; hashed before storage.
    pub password: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique driving license number.
    pub license_number: String,
}

impl NewDriver {
    /// Creates a driver registration with empty names.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        license_number: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            license_number: license_number.into(),
            ..Self::default()
        }
    }

    /// Sets the given and family names.
    #[must_use]
    pub fn with_names(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(first: &str, last: &str) -> Driver {
        Driver {
            id: 1,
            username: "jdoe".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            license_number: "ABC12345".to_string(),
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(driver("John", "Doe").full_name(), "John Doe");
        assert_eq!(driver("John", "").full_name(), "John");
        assert_eq!(driver("", "").full_name(), "jdoe");
    }
}
