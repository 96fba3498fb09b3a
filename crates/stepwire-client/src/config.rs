//! Client configuration parsed from environment variables.
//!
//! All settings can be overridden via environment variables prefixed with
//! `STEPWIRE_`. Command-line flags take precedence over the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::connection::ConnectionConfig;
use crate::error::ClientError;

/// How much of the companion exchange is reported on stderr.
///
/// `Trace` shows every envelope, `Debug` the connection lifecycle and `Warn`
/// results degraded because the companion has not started. `Off` keeps
/// stderr quiet for editors that capture it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Every envelope sent and received.
    Trace,
    /// Connections opened, cached and abandoned; patterns built.
    Debug,
    /// Start-up banner of the binary.
    #[default]
    Info,
    /// Calls answered with an empty result.
    Warn,
    /// Failed commands and invalid configuration.
    Error,
    /// Nothing.
    Off,
}

impl LogLevel {
    const NAMES: [(&'static str, Self); 7] = [
        ("trace", Self::Trace),
        ("debug", Self::Debug),
        ("info", Self::Info),
        ("warn", Self::Warn),
        ("warning", Self::Warn),
        ("error", Self::Error),
        ("off", Self::Off),
    ];

    /// `tracing` filter directive enabling this level and everything above.
    #[must_use]
    pub fn directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ClientError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim();
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|&(_, level)| level)
            .ok_or_else(|| {
                ClientError::InvalidConfig(format!(
                    "unknown log level '{raw}' (expected trace, debug, info, warn, error or off)"
                ))
            })
    }
}

/// Default connect timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

/// Default read/write timeout in milliseconds.
const DEFAULT_IO_TIMEOUT_MS: u64 = 30_000;

/// Configuration for the client and the `stepwire` binary.
///
/// # Environment Variables
///
/// - `STEPWIRE_LOG_LEVEL`: Sets the log level (trace, debug, info, warn,
///   error, off)
/// - `STEPWIRE_API_PORT`: Port the companion process listens on
/// - `STEPWIRE_CONNECT_TIMEOUT_MS`: Time allowed to connect
/// - `STEPWIRE_IO_TIMEOUT_MS`: Time allowed per read or write, `0` to wait
///   indefinitely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: LogLevel,
    /// Port of the companion process, if known.
    pub api_port: Option<u16>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Read/write timeout in milliseconds; zero disables it.
    pub io_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            api_port: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
        }
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str, expected: &str) -> Result<T, ClientError> {
    value.trim().parse().map_err(|_| {
        ClientError::InvalidConfig(format!("invalid {key} value '{value}', expected {expected}"))
    })
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Falls back to defaults for missing values.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidConfig` if an environment variable
    /// contains an invalid value.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps variable names to
    /// values.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidConfig` if a value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let log_level = match lookup("STEPWIRE_LOG_LEVEL") {
            Some(val) => val.parse()?,
            None => LogLevel::default(),
        };

        let api_port = lookup("STEPWIRE_API_PORT")
            .map(|val| parse_number("STEPWIRE_API_PORT", &val, "a port number"))
            .transpose()?;

        let connect_timeout_ms = match lookup("STEPWIRE_CONNECT_TIMEOUT_MS") {
            Some(val) => parse_number::<u64>(
                "STEPWIRE_CONNECT_TIMEOUT_MS",
                &val,
                "a positive integer",
            )?,
            None => DEFAULT_CONNECT_TIMEOUT_MS,
        };
        if connect_timeout_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "STEPWIRE_CONNECT_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        let io_timeout_ms = match lookup("STEPWIRE_IO_TIMEOUT_MS") {
            Some(val) => parse_number("STEPWIRE_IO_TIMEOUT_MS", &val, "a non-negative integer")?,
            None => DEFAULT_IO_TIMEOUT_MS,
        };

        Ok(Self {
            log_level,
            api_port,
            connect_timeout_ms,
            io_timeout_ms,
        })
    }

    /// Apply optional overrides to an existing configuration.
    ///
    /// This is intended for CLI overrides that should take precedence over
    /// environment-based defaults.
    #[must_use]
    pub fn apply_overrides(mut self, log_level: Option<LogLevel>, api_port: Option<u16>) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }

        if let Some(port) = api_port {
            self.api_port = Some(port);
        }

        self
    }

    /// Create a new configuration with the specified log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Socket settings derived from this configuration.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            io_timeout: (self.io_timeout_ms > 0).then(|| Duration::from_millis(self.io_timeout_ms)),
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[rstest]
    #[case("trace", LogLevel::Trace)]
    #[case("debug", LogLevel::Debug)]
    #[case("info", LogLevel::Info)]
    #[case("warn", LogLevel::Warn)]
    #[case("warning", LogLevel::Warn)]
    #[case("error", LogLevel::Error)]
    #[case("DEBUG", LogLevel::Debug)]
    #[case(" Off ", LogLevel::Off)]
    fn log_level_parses_valid_values(#[case] raw: &str, #[case] expected: LogLevel) {
        assert_eq!(raw.parse::<LogLevel>().ok(), Some(expected));
    }

    #[test]
    fn log_level_rejects_invalid_values() {
        let result = "invalid".parse::<LogLevel>();
        assert!(result.unwrap_err().to_string().contains("unknown log level"));
    }

    #[test]
    fn every_accepted_name_round_trips_through_its_directive() {
        for (name, level) in LogLevel::NAMES {
            let parsed = name.parse::<LogLevel>().unwrap();
            assert_eq!(parsed, level);
            assert_eq!(parsed.directive().parse::<LogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("STEPWIRE_LOG_LEVEL", "debug"),
            ("STEPWIRE_API_PORT", "61234"),
            ("STEPWIRE_CONNECT_TIMEOUT_MS", "500"),
            ("STEPWIRE_IO_TIMEOUT_MS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.api_port, Some(61_234));
        assert_eq!(config.connect_timeout_ms, 500);
        assert_eq!(config.connection_config().io_timeout, None);
    }

    #[rstest]
    #[case("STEPWIRE_API_PORT", "70000")]
    #[case("STEPWIRE_API_PORT", "port")]
    #[case("STEPWIRE_CONNECT_TIMEOUT_MS", "0")]
    #[case("STEPWIRE_IO_TIMEOUT_MS", "-1")]
    #[case("STEPWIRE_LOG_LEVEL", "loud")]
    fn rejects_invalid_values(#[case] key: &str, #[case] value: &str) {
        let result = ClientConfig::from_lookup(lookup_from(&[(key, value)]));
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn connection_config_converts_milliseconds() {
        let config = ClientConfig::default().connection_config();
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.io_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn apply_overrides_updates_selected_fields() {
        let config = ClientConfig::default().apply_overrides(Some(LogLevel::Error), Some(42));
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.api_port, Some(42));

        let config = ClientConfig::default()
            .with_log_level(LogLevel::Debug)
            .apply_overrides(None, None);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.api_port, None);
    }
}
