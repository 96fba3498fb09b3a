//! Search patterns for locating a step's declaration in source.

use stepwire_patterns::{build_search_pattern, strip_table_marker};
use tracing::debug;

use crate::client::StepClient;
use crate::error::ClientError;
use crate::messages::StepValueRequest;
use crate::resolver::ConnectionResolver;

impl<R: ConnectionResolver> StepClient<R> {
    /// Build a regular expression matching the declaration of the step
    /// written as `input`.
    ///
    /// A trailing `" <table>"` is removed before the companion parses the
    /// text; the generated pattern accepts a following table either way. If
    /// the companion finds no step, or is not reachable yet, the pattern is
    /// built from empty text and stays well formed.
    ///
    /// # Errors
    ///
    /// Returns any [`ClientError`] other than a connection-initialization
    /// failure.
    pub fn search_pattern(&self, context: &R::Context, input: &str) -> Result<String, ClientError> {
        let (step_text, has_inline_table) = strip_table_marker(input);
        let request = StepValueRequest::new(step_text).with_inline_table(has_inline_table);
        let parsed = self
            .request_step_value(context, request)?
            .unwrap_or_default()
            .map(|value| value.step_value)
            .unwrap_or_default();
        debug!(input, parsed = %parsed, "building declaration search pattern");
        Ok(build_search_pattern(&parsed))
    }
}
