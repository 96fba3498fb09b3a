//! Literal markers that decorate step text but are not part of the step.

/// Token that stands for a tabular argument following a step.
pub const TABLE_MARKER: &str = "<table>";

/// Suffix appended to step input when the step carries an inline table.
pub const TABLE_SUFFIX: &str = " <table>";

/// Bullet that display text may carry in front of a step.
pub const BULLET: &str = "* ";

/// Remove a trailing [`TABLE_SUFFIX`] from step input.
///
/// The match is exact and case-sensitive. Returns the remaining text and
/// whether the suffix was present.
///
/// # Examples
/// ```
/// use stepwire_patterns::strip_table_marker;
/// assert_eq!(strip_table_marker("Given a table <table>"), ("Given a table", true));
/// assert_eq!(strip_table_marker("Given a table <TABLE>"), ("Given a table <TABLE>", false));
/// ```
#[must_use]
pub fn strip_table_marker(input: &str) -> (&str, bool) {
    input
        .strip_suffix(TABLE_SUFFIX)
        .map_or((input, false), |stripped| (stripped, true))
}

/// Remove a leading [`BULLET`] from parsed display text.
///
/// Only the first bullet is removed; bullets elsewhere in the text are
/// literal step content.
#[must_use]
pub fn strip_bullet(parsed: &str) -> &str {
    parsed.strip_prefix(BULLET).unwrap_or(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Given a table <table>", "Given a table", true)]
    #[case("Given a table", "Given a table", false)]
    #[case("Given a table <table> <table>", "Given a table <table>", true)]
    #[case("Given a table<table>", "Given a table<table>", false)]
    #[case(" <table>", "", true)]
    #[case("", "", false)]
    fn strips_trailing_table_marker(
        #[case] input: &str,
        #[case] expected: &str,
        #[case] had_table: bool,
    ) {
        assert_eq!(strip_table_marker(input), (expected, had_table));
    }

    #[test]
    fn leaves_inner_table_marker_untouched() {
        let (stripped, had_table) = strip_table_marker("Given <table> rows");
        assert_eq!(stripped, "Given <table> rows");
        assert!(!had_table);
    }

    #[rstest]
    #[case("* Say hello", "Say hello")]
    #[case("Say hello", "Say hello")]
    #[case("* * nested", "* nested")]
    #[case("Multiply 2 * 3", "Multiply 2 * 3")]
    #[case("*no space", "*no space")]
    fn strips_only_leading_bullet(#[case] parsed: &str, #[case] expected: &str) {
        assert_eq!(strip_bullet(parsed), expected);
    }
}
