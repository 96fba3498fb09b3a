//! Typed request/response client for the stepwire companion process.
//!
//! The companion indexes specs and their steps and answers requests over a
//! local connection. This crate wraps each request in a tagged envelope,
//! performs a single write-then-read round trip and unwraps the paired
//! response.
//!
//! # Overview
//!
//! - [`client::call`] is the generic exchange over any
//!   [`connection::Connection`].
//! - [`client::StepClient`] resolves connections per host context and
//!   returns empty results while the companion is still starting.
//! - [`client::StepClient::search_pattern`] turns step text into a regular
//!   expression locating the step's declaration.
//!
//! # Configuration
//!
//! The `stepwire` binary reads `STEPWIRE_LOG_LEVEL`, `STEPWIRE_API_PORT`,
//! `STEPWIRE_CONNECT_TIMEOUT_MS` and `STEPWIRE_IO_TIMEOUT_MS`. The library
//! itself only sees what callers pass in.
//!
//! # Example
//!
//! ```no_run
//! use stepwire_client::client::StepClient;
//! use stepwire_client::connection::ConnectionConfig;
//! use stepwire_client::resolver::PortRegistry;
//!
//! let mut registry = PortRegistry::new(ConnectionConfig::default());
//! registry.register("shop", 61_234);
//! let client = StepClient::new(registry);
//! let steps = client.fetch_all_steps("shop")?;
//! # Ok::<(), stepwire_client::error::ClientError>(())
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod messages;
pub mod resolver;
mod search;

/// Test doubles for unit and integration tests.
///
/// This module is hidden from documentation as it's intended for internal
/// test use only.
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;
