//! Per-session visit counter for the home page.

use crate::Result;
use crate::storage::{SessionBackend, SessionKey};
use serde_json::Value;

/// Session key holding the visit count.
pub const NUM_VISITS: &str = "num_visits";

/// Counts a visit to the home page and returns the new total.
///
/// A missing or non-numeric stored value counts as zero. The read and the
/// write are separate store calls, so concurrent requests from one session
/// can lose an increment.
pub fn record_visit(sessions: &dyn SessionBackend, key: &SessionKey) -> Result<u64> {
    let previous = sessions
        .get(key, NUM_VISITS)?
        .as_ref()
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let visits = previous.saturating_add(1);

    sessions.set(key, NUM_VISITS, Value::from(visits))?;
    metrics::counter!("taxi_index_visits_total").increment(1);
    tracing::debug!(visits, "Recorded home page visit");
    Ok(visits)
}

/// Returns `""` for one visit and `"s"` otherwise.
#[must_use]
pub const fn plural_suffix(count: u64) -> &'static str {
    if count == 1 { "" } else { "s" }
}
