//! Step-text to search-pattern translation for stepwire.
//!
//! The companion process renders each step with `{}` in place of its
//! parameters. This crate turns such a display value into a regular
//! expression that finds the step's declaration in a source file, either as
//! a `* step` line or inside a `[Step("...")]` attribute.
//!
//! The generated pattern uses a negative lookahead, so it targets
//! backtracking engines used by editor search rather than the `regex` crate.

mod marker;
mod pattern;

pub use marker::{BULLET, TABLE_MARKER, TABLE_SUFFIX, strip_bullet, strip_table_marker};
pub use pattern::{
    DECLARATION_PREFIX, DECLARATION_SUFFIX, PLACEHOLDER, PLACEHOLDER_PATTERN,
    build_search_pattern,
};
