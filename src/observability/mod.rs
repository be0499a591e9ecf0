//! Observability: structured logging, request correlation and metrics.

mod exporter;
mod request_context;

pub use exporter::install_prometheus;
pub use request_context::{
    REQUEST_ID_HEADER, RequestContext, current_request_id, scope_request_context,
};

use crate::config::LoggingSettings;
use crate::{Error, Result};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses `pretty` or `json`, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Builds the event filter. `verbose` raises the default `info` level to `debug`.
///
/// # Errors
///
/// Returns an error if the directive does not parse.
pub fn build_filter(settings: &LoggingSettings, verbose: bool) -> Result<EnvFilter> {
    let directive = if verbose && settings.filter == "info" {
        "debug"
    } else {
        settings.filter.as_str()
    };
    EnvFilter::try_new(directive)
        .map_err(|e| Error::InvalidInput(format!("log filter '{directive}': {e}")))
}

/// Initializes the global tracing subscriber.
///
/// Logs go to stderr so stdout stays free for command output.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the filter is
/// invalid.
pub fn init(settings: &LoggingSettings, verbose: bool) -> Result<()> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(Error::operation(
            "observability_init",
            "observability already initialized",
        ));
    }

    let filter = build_filter(settings, verbose)?;

    match settings.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        },
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_thread_names(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        },
    }

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| Error::operation("observability_init", "failed to mark observability initialized"))
}

/// Helper to convert init errors.
#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::operation("observability_init", e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_build_filter() {
        let settings = LoggingSettings::default();
        assert_eq!(build_filter(&settings, true).unwrap().to_string(), "debug");
        assert_eq!(build_filter(&settings, false).unwrap().to_string(), "info");

        let custom = LoggingSettings {
            filter: "taxi_service=trace".to_string(),
            ..LoggingSettings::default()
        };
        assert_eq!(
            build_filter(&custom, true).unwrap().to_string(),
            "taxi_service=trace"
        );
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let settings = LoggingSettings {
            filter: "taxi_service=loud".to_string(),
            ..LoggingSettings::default()
        };
        assert!(matches!(build_filter(&settings, false), Err(Error::InvalidInput(_))));
    }
}
