//! Keyword search for list pages.
//!
//! Each list page binds one [`SearchField`] per entity type and reads the
//! `search_query` request parameter. Two operations make up the behavior:
//!
//! - [`build_search_context`] pre-fills the search box with the current query
//! - [`filter_entities`] narrows the page's collection to matching rows
//!
//! Validation never fails the request. An unacceptable query leaves the
//! collection unfiltered.

use crate::models::{Entity, SearchField};
use crate::storage::Collection;
use serde::{Deserialize, Serialize};

/// Name of the request parameter carrying the search text.
pub const SEARCH_QUERY_PARAM: &str = "search_query";

/// Decoded query-string parameters, in request order.
///
/// Repeated names are kept; lookups return the last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RequestParams(Vec<(String, String)>);

impl RequestParams {
    /// Builds parameters from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the last value supplied for `name`.
    #[must_use]
    pub fn get_last(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns true if no parameters were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Why a search query was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The query contains a NUL character.
    NullCharacter,
}

impl InvalidReason {
    /// Returns the reason as a metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NullCharacter => "null_character",
        }
    }
}

/// Result of validating the search form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Cleaned query; empty when no search was requested.
    Valid(String),
    /// The query was rejected; the caller shows everything.
    Invalid(InvalidReason),
}

/// Validates the `search_query` parameter.
///
/// The field is optional and unbounded. Values are accepted verbatim unless
/// they contain a NUL character.
#[must_use]
pub fn validate(params: &RequestParams) -> SearchOutcome {
    let raw = params.get_last(SEARCH_QUERY_PARAM).unwrap_or_default();
    if raw.contains('\0') {
        return SearchOutcome::Invalid(InvalidReason::NullCharacter);
    }
    SearchOutcome::Valid(raw.to_string())
}

/// The search box as shown on a list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchForm {
    /// Pre-filled value.
    pub query: String,
    /// Placeholder text, e.g. `Search by model`.
    pub placeholder: String,
}

/// Search state handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchContext {
    /// The search box.
    pub search_form: SearchForm,
    /// Attribute the page filters on.
    pub search_field: SearchField,
}

/// Builds the search box for a list page, pre-filled with the current query.
///
/// Missing parameters pre-fill an empty string. The raw value is echoed even
/// when [`validate`] would reject it; the renderer escapes it.
#[must_use]
pub fn build_search_context(field: SearchField, params: &RequestParams) -> SearchContext {
    let query = params
        .get_last(SEARCH_QUERY_PARAM)
        .unwrap_or_default()
        .to_string();

    SearchContext {
        search_form: SearchForm {
            query,
            placeholder: field.placeholder(),
        },
        search_field: field,
    }
}

/// Narrows `base` to entities whose `field` contains the query.
///
/// Matching is a case-insensitive substring test. An empty or rejected
/// query returns `base` unchanged.
#[must_use]
pub fn filter_entities<E: Entity>(
    base: Collection<E>,
    field: SearchField,
    params: &RequestParams,
) -> Collection<E> {
    match validate(params) {
        SearchOutcome::Valid(query) if query.is_empty() => {
            metrics::counter!(
                "taxi_search_requests_total",
                "entity" => E::KIND,
                "outcome" => "unfiltered"
            )
            .increment(1);
            base
        },
        SearchOutcome::Valid(query) => {
            metrics::counter!(
                "taxi_search_requests_total",
                "entity" => E::KIND,
                "outcome" => "filtered"
            )
            .increment(1);
            tracing::debug!(entity = E::KIND, field = %field, "Filtering collection");
            base.filter_contains(field, query)
        },
        SearchOutcome::Invalid(reason) => {
            metrics::counter!(
                "taxi_search_requests_total",
                "entity" => E::KIND,
                "outcome" => "invalid"
            )
            .increment(1);
            tracing::debug!(
                entity = E::KIND,
                reason = reason.as_str(),
                "Ignoring invalid search query"
            );
            base
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Car, Driver, Manufacturer};
    use proptest::prelude::*;
    use test_case::test_case;

    fn params(query: &str) -> RequestParams {
        RequestParams::from_pairs([(SEARCH_QUERY_PARAM, query)])
    }

    #[test]
    fn test_get_last_wins() {
        let params = RequestParams::from_pairs([
            ("search_query", "first"),
            ("page", "2"),
            ("search_query", "second"),
        ]);
        assert_eq!(params.get_last("search_query"), Some("second"));
        assert_eq!(params.get_last("page"), Some("2"));
        assert_eq!(params.get_last("missing"), None);
    }

    #[test_case("" ; "empty")]
    #[test_case("Driver" ; "plain")]
    #[test_case("  padded  " ; "whitespace kept")]
    #[test_case("100%_\\" ; "wildcards")]
    fn test_validate_accepts_verbatim(query: &str) {
        assert_eq!(validate(&params(query)), SearchOutcome::Valid(query.to_string()));
    }

    #[test]
    fn test_validate_absent_is_empty() {
        assert_eq!(
            validate(&RequestParams::default()),
            SearchOutcome::Valid(String::new())
        );
    }

    #[test]
    fn test_validate_rejects_nul() {
        assert_eq!(
            validate(&params("a\0b")),
            SearchOutcome::Invalid(InvalidReason::NullCharacter)
        );
    }

    #[test]
    fn test_build_search_context() {
        let ctx = build_search_context(Car::SEARCH_FIELD, &params("civic"));
        assert_eq!(ctx.search_form.query, "civic");
        assert_eq!(ctx.search_form.placeholder, "Search by model");
        assert_eq!(ctx.search_field, Car::SEARCH_FIELD);

        let ctx = build_search_context(Driver::SEARCH_FIELD, &RequestParams::default());
        assert_eq!(ctx.search_form.query, "");
    }

    #[test]
    fn test_filter_entities_narrows_on_field() {
        let filtered = filter_entities(
            Collection::<Manufacturer>::all(),
            Manufacturer::SEARCH_FIELD,
            &params("toy"),
        );
        assert_eq!(filtered.filters().len(), 1);
        assert_eq!(filtered.filters()[0].field, Manufacturer::SEARCH_FIELD);
        assert_eq!(filtered.filters()[0].value, "toy");
    }

    #[test]
    fn test_filter_entities_keeps_base_filters() {
        let base = Collection::<Car>::all().filter_contains(Car::SEARCH_FIELD, "a");
        let filtered = filter_entities(base.clone(), Car::SEARCH_FIELD, &params("b"));
        assert_eq!(filtered.filters().len(), 2);
        assert_eq!(&filtered.filters()[..1], base.filters());
    }

    #[test_case(RequestParams::default() ; "absent")]
    #[test_case(params("") ; "empty")]
    #[test_case(params("bad\0") ; "invalid")]
    fn test_filter_entities_returns_base(params: RequestParams) {
        let base = Collection::<Driver>::all();
        let filtered = filter_entities(base.clone(), Driver::SEARCH_FIELD, &params);
        assert_eq!(filtered, base);
    }

    proptest! {
        #[test]
        fn prop_non_empty_query_adds_one_filter(query in "[a-zA-Z0-9%_ ]{1,40}") {
            let filtered = filter_entities(
                Collection::<Driver>::all(),
                Driver::SEARCH_FIELD,
                &params(&query),
            );
            prop_assert_eq!(filtered.filters().len(), 1);
            prop_assert_eq!(&filtered.filters()[0].value, &query);
        }

        #[test]
        fn prop_nul_anywhere_fails_open(prefix in ".{0,10}", suffix in ".{0,10}") {
            let query = format!("{prefix}\0{suffix}");
            let filtered = filter_entities(
                Collection::<Car>::all(),
                Car::SEARCH_FIELD,
                &params(&query),
            );
            prop_assert!(!filtered.is_filtered());
        }
    }
}
