//! Lazy entity collections.

use crate::models::{Entity, SearchField};
use std::fmt;
use std::marker::PhantomData;

/// A case-insensitive "attribute contains value" condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringFilter {
    /// Attribute to match against.
    pub field: SearchField,
    /// Literal substring; wildcard characters carry no special meaning.
    pub value: String,
}

/// Description of a set of entities of one type.
///
/// Nothing is read until the collection is passed to
/// [`EntityStore::fetch`](super::EntityStore::fetch). Narrowing only appends
/// conditions, so a collection can be handed through several layers and
/// evaluated once at the end.
pub struct Collection<E> {
    filters: Vec<SubstringFilter>,
    marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Collection<E> {
    /// Every stored entity of type `E`.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            filters: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Narrows the collection to entities whose `field` contains `value`,
    /// ignoring case.
    #[must_use]
    pub fn filter_contains(mut self, field: SearchField, value: impl Into<String>) -> Self {
        self.filters.push(SubstringFilter {
            field,
            value: value.into(),
        });
        self
    }

    /// Returns the accumulated conditions.
    #[must_use]
    pub fn filters(&self) -> &[SubstringFilter] {
        &self.filters
    }

    /// Returns true when at least one condition narrows the collection.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.filters.is_empty()
    }
}

impl<E: Entity> Default for Collection<E> {
    fn default() -> Self {
        Self::all()
    }
}

impl<E> Clone for Collection<E> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            marker: PhantomData,
        }
    }
}

impl<E> PartialEq for Collection<E> {
    fn eq(&self, other: &Self) -> bool {
        self.filters == other.filters
    }
}

impl<E: Entity> fmt::Debug for Collection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &E::KIND)
            .field("filters", &self.filters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Car;

    #[test]
    fn test_all_is_unfiltered() {
        let cars = Collection::<Car>::all();
        assert!(!cars.is_filtered());
        assert!(cars.filters().is_empty());
    }

    #[test]
    fn test_filter_contains_appends() {
        let cars = Collection::<Car>::all()
            .filter_contains(Car::SEARCH_FIELD, "Lan")
            .filter_contains(Car::SEARCH_FIELD, "cer");

        assert!(cars.is_filtered());
        assert_eq!(
            cars.filters()
                .iter()
                .map(|f| f.value.as_str())
                .collect::<Vec<_>>(),
            vec!["Lan", "cer"]
        );
        assert_ne!(cars, Collection::all());
    }
}
