//! Declaration search-pattern assembly.

mod compiler;
mod lexer;

use crate::marker::strip_bullet;

/// How the companion renders a parameter slot in display text.
pub const PLACEHOLDER: &str = "{}";

/// Sub-pattern substituted for each [`PLACEHOLDER`].
///
/// Matches a quoted string or an angle-bracketed token, but refuses to start
/// at the literal table marker.
pub const PLACEHOLDER_PATTERN: &str = r#"((?!<table>)(<|").+(>|"))"#;

/// Line-start alternatives for a step declaration: a `*` bullet or an opening
/// `[Step("` attribute.
pub const DECLARATION_PREFIX: &str = r#"^(\*[ |\t]*|[ |\t]*\[Step\(")"#;

/// Trailer after the step text: an optional pipe table or table marker, an
/// optional attribute close, then the line break.
pub const DECLARATION_SUFFIX: &str = r#"\s*(((\r?\n\s*)+\|([\w ]+\|)+)|(<table>))?("\)\])?\r?\n"#;

/// Build the search pattern locating a step's declaration in source.
///
/// `parsed` is the display value returned by the companion. A leading bullet
/// is dropped, literal text is escaped and every `{}` becomes
/// [`PLACEHOLDER_PATTERN`]. Empty input yields a well-formed pattern with an
/// empty body.
///
/// # Examples
/// ```
/// use stepwire_patterns::build_search_pattern;
/// let pattern = build_search_pattern("Vowels in {}");
/// assert!(pattern.starts_with(r#"^(\*[ |\t]*|[ |\t]*\[Step\(")Vowels in ((?!<table>)(<|")"#));
/// assert!(pattern.ends_with(r"\r?\n"));
/// ```
#[must_use]
pub fn build_search_pattern(parsed: &str) -> String {
    let tokens = lexer::lex_step_value(strip_bullet(parsed));
    let body = compiler::compile_body(&tokens);

    let mut pattern = String::with_capacity(
        DECLARATION_PREFIX
            .len()
            .saturating_add(body.len())
            .saturating_add(DECLARATION_SUFFIX.len()),
    );
    pattern.push_str(DECLARATION_PREFIX);
    pattern.push_str(&body);
    pattern.push_str(DECLARATION_SUFFIX);
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_pattern_for_literal_step() {
        assert_eq!(
            build_search_pattern("Say hello"),
            format!("{DECLARATION_PREFIX}Say hello{DECLARATION_SUFFIX}")
        );
    }

    #[test]
    fn drops_leading_bullet_before_assembly() {
        assert_eq!(
            build_search_pattern("* Say hello"),
            build_search_pattern("Say hello")
        );
    }

    #[test]
    fn empty_value_yields_prefix_and_suffix_only() {
        assert_eq!(
            build_search_pattern(""),
            format!("{DECLARATION_PREFIX}{DECLARATION_SUFFIX}")
        );
    }

    #[test]
    fn table_guard_precedes_the_opening_delimiter() {
        assert!(PLACEHOLDER_PATTERN.starts_with("((?!<table>)(<|\")"));
    }
}
