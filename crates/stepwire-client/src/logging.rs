//! Structured logging with environment variable configuration.
//!
//! Logs are written to stderr so that command output on stdout stays
//! machine-readable.

use tracing_subscriber::EnvFilter;

use crate::config::ClientConfig;

fn filter_from_config(config: &ClientConfig) -> EnvFilter {
    EnvFilter::new(config.log_level.directive())
}

/// Initialise the logging subsystem based on configuration.
///
/// Log level precedence (highest to lowest):
///
/// 1. CLI `--log-level` (parsed into `config.log_level`)
/// 2. `STEPWIRE_LOG_LEVEL` (parsed into `config.log_level`)
/// 3. Default configuration value
///
/// If a global subscriber is already set, the error is ignored and the first
/// subscriber stays in place.
pub fn init_logging(config: &ClientConfig) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_from_config(config))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
