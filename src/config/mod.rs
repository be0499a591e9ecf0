//! Configuration management.
//!
//! Values come from defaults, then the TOML config file, then environment
//! variables.

use crate::observability::LogFormat;
use crate::security::{DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`TaxiConfig::database_path`].
pub const ENV_DATABASE_PATH: &str = "TAXI_DATABASE_PATH";
/// Environment variable overriding [`TaxiConfig::host`].
pub const ENV_HOST: &str = "TAXI_HOST";
/// Environment variable overriding [`TaxiConfig::port`].
pub const ENV_PORT: &str = "TAXI_PORT";
/// Environment variable overriding [`TaxiConfig::session_ttl`].
pub const ENV_SESSION_TTL_SECS: &str = "TAXI_SESSION_TTL_SECS";
/// Environment variable overriding [`TaxiConfig::secure_cookies`].
pub const ENV_SECURE_COOKIES: &str = "TAXI_SECURE_COOKIES";
/// Environment variable overriding [`TaxiConfig::password_hash_cost`].
pub const ENV_PASSWORD_HASH_COST: &str = "TAXI_PASSWORD_HASH_COST";
/// Environment variable overriding the log format.
pub const ENV_LOG_FORMAT: &str = "TAXI_LOG_FORMAT";
/// Environment variable overriding the log filter.
pub const ENV_LOG_FILTER: &str = "RUST_LOG";
/// Environment variable enabling the Prometheus exporter.
pub const ENV_METRICS_ENABLED: &str = "TAXI_METRICS_ENABLED";
/// Environment variable overriding the Prometheus exporter port.
pub const ENV_METRICS_PORT: &str = "TAXI_METRICS_PORT";

const APP_DIR: &str = "taxi";

/// Main configuration for the taxi service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxiConfig {
    /// `SQLite` database file.
    pub database_path: PathBuf,
    /// Address the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Lifetime of a session after its last write.
    pub session_ttl: Duration,
    /// Adds `Secure` to the session cookie.
    pub secure_cookies: bool,
    /// bcrypt work factor for newly stored passwords.
    pub password_hash_cost: u32,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `info` or `taxi_service=debug`.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSettings {
    /// Whether to serve `/metrics`.
    pub enabled: bool,
    /// Port of the exporter's listener.
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Database path.
    pub database_path: Option<String>,
    /// Bind host.
    pub host: Option<String>,
    /// Bind port.
    pub port: Option<u16>,
    /// Session lifetime in seconds.
    pub session_ttl_secs: Option<u64>,
    /// Secure cookie flag.
    pub secure_cookies: Option<bool>,
    /// bcrypt work factor.
    pub password_hash_cost: Option<u32>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
}

/// Metrics section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileMetrics {
    /// Exporter switch.
    pub enabled: Option<bool>,
    /// Exporter port.
    pub port: Option<u16>,
}

impl Default for TaxiConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            session_ttl: crate::storage::DEFAULT_SESSION_TTL,
            secure_cookies: false,
            password_hash_cost: DEFAULT_HASH_COST,
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl TaxiConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the configuration for the binary.
    ///
    /// An explicit `path` must exist and parse. Without one, the default
    /// location is tried. Environment variables are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file cannot be loaded or an
    /// environment variable holds an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| Error::operation("read_config_file", e))?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML, unknown keys or invalid values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from `<config dir>/taxi/config.toml`.
    ///
    /// Returns default configuration if no file is found or it fails to load.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            },
        }
    }

    /// Converts a `ConfigFile` to `TaxiConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = file.database_path {
            config.database_path = PathBuf::from(path);
        }
        if let Some(host) = file.host {
            config.host = host;
        }
        if let Some(port) = file.port {
            config.port = port;
        }
        if let Some(secs) = file.session_ttl_secs {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(secure) = file.secure_cookies {
            config.secure_cookies = secure;
        }
        if let Some(cost) = file.password_hash_cost {
            config.password_hash_cost = parse_hash_cost("password_hash_cost", cost)?;
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = parse_log_format(&format)?;
            }
            if let Some(filter) = logging.filter {
                config.logging.filter = filter;
            }
        }
        if let Some(metrics) = file.metrics {
            if let Some(enabled) = metrics.enabled {
                config.metrics.enabled = enabled;
            }
            if let Some(port) = metrics.port {
                config.metrics.port = port;
            }
        }

        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the variable when a value does
    /// not parse.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_env(ENV_PORT, &port)?;
        }
        if let Some(secs) = lookup(ENV_SESSION_TTL_SECS) {
            self.session_ttl = Duration::from_secs(parse_env(ENV_SESSION_TTL_SECS, &secs)?);
        }
        if let Some(secure) = lookup(ENV_SECURE_COOKIES) {
            self.secure_cookies = parse_bool(ENV_SECURE_COOKIES, &secure)?;
        }
        if let Some(cost) = lookup(ENV_PASSWORD_HASH_COST) {
            let cost = parse_env(ENV_PASSWORD_HASH_COST, &cost)?;
            self.password_hash_cost = parse_hash_cost(ENV_PASSWORD_HASH_COST, cost)?;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = parse_log_format(&format)?;
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            self.logging.filter = filter;
        }
        if let Some(enabled) = lookup(ENV_METRICS_ENABLED) {
            self.metrics.enabled = parse_bool(ENV_METRICS_ENABLED, &enabled)?;
        }
        if let Some(port) = lookup(ENV_METRICS_PORT) {
            self.metrics.port = parse_env(ENV_METRICS_PORT, &port)?;
        }
        Ok(())
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Returns `<config dir>/taxi/config.toml` for the current user.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join(APP_DIR).join("config.toml"))
}

/// Returns `<data dir>/taxi/taxi.db`, or `taxi.db` when no home is known.
fn default_database_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("taxi.db"),
        |dirs| dirs.data_dir().join(APP_DIR).join("taxi.db"),
    )
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    LogFormat::parse(value)
        .ok_or_else(|| Error::InvalidInput(format!("unknown log format '{value}'")))
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{name}: invalid value '{value}'")))
}

fn parse_hash_cost(name: &str, cost: u32) -> Result<u32> {
    if (MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
        Ok(cost)
    } else {
        Err(Error::InvalidInput(format!(
            "{name} must be between {MIN_HASH_COST} and {MAX_HASH_COST}, got {cost}"
        )))
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!("{name}: invalid value '{value}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TaxiConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.session_ttl, Duration::from_secs(1_209_600));
        assert!(!config.secure_cookies);
        assert_eq!(config.password_hash_cost, 12);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(!config.metrics.enabled);
        assert!(config.database_path.ends_with("taxi.db"));
    }

    #[test]
    fn test_from_toml() {
        let config = TaxiConfig::from_toml(
            r#"
            database_path = "/tmp/t.db"
            port = 9000
            session_ttl_secs = 60
            secure_cookies = true
            password_hash_cost = 10

            [logging]
            format = "json"

            [metrics]
            enabled = true
            port = 9191
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/t.db"));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert!(config.secure_cookies);
        assert_eq!(config.password_hash_cost, 10);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.metrics, MetricsSettings { enabled: true, port: 9191 });
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(TaxiConfig::from_toml("colour = \"blue\"").is_err());
        assert!(matches!(
            TaxiConfig::from_toml("[logging]\nformat = \"xml\""),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"0.0.0.0\"").unwrap();

        let config = TaxiConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = TaxiConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TaxiConfig::default();
        config
            .apply_env(env(&[
                (ENV_DATABASE_PATH, "/data/taxi.db"),
                (ENV_PORT, "8080"),
                (ENV_SECURE_COOKIES, "yes"),
                (ENV_LOG_FORMAT, "JSON"),
                (ENV_LOG_FILTER, "debug"),
                (ENV_METRICS_ENABLED, "1"),
            ]))
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/taxi.db"));
        assert_eq!(config.port, 8080);
        assert!(config.secure_cookies);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "debug");
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_env_invalid_value_names_variable() {
        let mut config = TaxiConfig::default();
        let err = config.apply_env(env(&[(ENV_PORT, "eighty")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));

        let err = config
            .apply_env(env(&[(ENV_SECURE_COOKIES, "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_SECURE_COOKIES));
    }

    #[test]
    fn test_hash_cost_must_be_in_bcrypt_range() {
        assert!(matches!(
            TaxiConfig::from_toml("password_hash_cost = 3"),
            Err(Error::InvalidInput(_))
        ));

        let mut config = TaxiConfig::default();
        let err = config
            .apply_env(env(&[(ENV_PASSWORD_HASH_COST, "32")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PASSWORD_HASH_COST));

        config
            .apply_env(env(&[(ENV_PASSWORD_HASH_COST, "4")]))
            .unwrap();
        assert_eq!(config.password_hash_cost, 4);
    }
}
