//! Shared metrics recording for `SQLite` backends.

use std::time::Instant;

/// Records a counter and a latency histogram for one storage operation.
///
/// * `store` - Store name (`entities`, `sessions`, `users`)
/// * `operation` - Operation name (`fetch`, `get`, `set`, ...)
/// * `start` - Operation start time from `Instant::now()`
/// * `status` - `success` or `error`
pub fn record_operation_metrics(
    store: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "store" => store,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "store" => store,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        // No global recorder is installed in unit tests; recording must not panic.
        record_operation_metrics("entities", "fetch", Instant::now(), "success");
        record_operation_metrics("sessions", "set", Instant::now(), "error");
    }
}
