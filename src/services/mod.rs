//! Request-level behaviors.
//!
//! Services take their collaborators as arguments: the base collection and
//! search field for list pages, the session backend for the visit counter and
//! login state. Nothing here reads the request implicitly.

pub mod auth;
pub mod search;
pub mod visits;

pub use auth::{AUTH_USER_KEY, current_user, login, logout};
pub use search::{
    RequestParams, SEARCH_QUERY_PARAM, SearchContext, SearchForm, SearchOutcome,
    build_search_context, filter_entities,
};
pub use visits::{NUM_VISITS, record_visit};
