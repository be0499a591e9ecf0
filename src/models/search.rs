//! Search field configuration.

use std::fmt;

/// Identifies the entity attribute a list view filters on.
///
/// Search fields are bound once per entity type (see
/// [`Entity::SEARCH_FIELD`](super::Entity::SEARCH_FIELD)) and never built from
/// request data, so the attribute name is always one of a fixed set of
/// column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchField {
    attribute: &'static str,
}

impl SearchField {
    /// Creates a search field for an attribute.
    #[must_use]
    pub const fn new(attribute: &'static str) -> Self {
        Self { attribute }
    }

    /// Returns the attribute name.
    #[must_use]
    pub const fn attribute(&self) -> &'static str {
        self.attribute
    }

    /// Returns the placeholder shown in the search box, e.g. `Search by username`.
    #[must_use]
    pub fn placeholder(&self) -> String {
        format!("Search by {}", self.attribute.replace('_', " "))
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute)
    }
}
