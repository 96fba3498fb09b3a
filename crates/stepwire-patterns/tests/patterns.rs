//! Behavioural tests for declaration search patterns.

use fancy_regex::Regex;
use rstest::rstest;
use stepwire_patterns::{
    DECLARATION_PREFIX, DECLARATION_SUFFIX, PLACEHOLDER_PATTERN, TABLE_MARKER,
    build_search_pattern, strip_table_marker,
};

#[test]
fn vowels_step_produces_expected_pattern() {
    assert_eq!(
        build_search_pattern("Vowels in {}"),
        concat!(
            r#"^(\*[ |\t]*|[ |\t]*\[Step\(")"#,
            r#"Vowels in ((?!<table>)(<|").+(>|"))"#,
            r#"\s*(((\r?\n\s*)+\|([\w ]+\|)+)|(<table>))?("\)\])?\r?\n"#,
        )
    );
}

#[rstest]
#[case("Vowels in {}", 1)]
#[case("Add {} to {} giving {}", 3)]
#[case("No parameters", 0)]
fn substitutes_every_placeholder(#[case] parsed: &str, #[case] expected: usize) {
    let pattern = build_search_pattern(parsed);
    assert_eq!(pattern.matches(PLACEHOLDER_PATTERN).count(), expected);
    assert!(!pattern.contains("{}"));
}

#[rstest]
#[case("* Say {}")]
#[case("* Say hello")]
fn leading_bullet_is_absent_from_body(#[case] parsed: &str) {
    let pattern = build_search_pattern(parsed);
    let body = pattern
        .strip_prefix(DECLARATION_PREFIX)
        .and_then(|rest| rest.strip_suffix(DECLARATION_SUFFIX))
        .unwrap_or_else(|| panic!("pattern should be framed: {pattern}"));
    assert!(body.starts_with("Say"), "unexpected body: {body}");
}

#[test]
fn table_input_keeps_table_clause_after_stripping() {
    let (stripped, had_table) = strip_table_marker("Given a table <table>");
    assert!(had_table);
    assert_eq!(stripped, "Given a table");

    let pattern = build_search_pattern(stripped);
    assert!(pattern.contains(&format!("|({TABLE_MARKER}))?")));
    assert!(pattern.contains(r"\|([\w ]+\|)+"));
    assert!(!pattern.contains(r"Given a table <table>"));
}

#[test]
fn pattern_is_anchored_at_line_start() {
    assert!(build_search_pattern("anything").starts_with('^'));
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?m){pattern}"))
        .unwrap_or_else(|err| panic!("pattern should compile: {pattern}: {err}"))
}

fn finds(pattern: &Regex, source: &str) -> bool {
    pattern
        .is_match(source)
        .unwrap_or_else(|err| panic!("matching {source:?} failed: {err}"))
}

#[rstest]
#[case::bullet_with_quoted_value("* Vowels in \"abc\"\n")]
#[case::bullet_with_angle_value("* Vowels in <word>\n")]
#[case::attribute_with_angle_value("[Step(\"Vowels in <word>\")]\n")]
#[case::indented_attribute("    [Step(\"Vowels in \"abc\"\")]\r\n")]
#[case::inside_larger_file("# Heading\n\n* Vowels in \"aeiou\"\n* Another step\n")]
fn vowels_pattern_finds_declaration(#[case] source: &str) {
    let pattern = compile(&build_search_pattern("Vowels in {}"));
    assert!(finds(&pattern, source), "expected a match in {source:?}");
}

#[rstest]
#[case::different_text("* Consonants in \"abc\"\n")]
#[case::missing_value("* Vowels in \n")]
#[case::unterminated_line("* Vowels in \"abc\"")]
fn vowels_pattern_ignores_other_lines(#[case] source: &str) {
    let pattern = compile(&build_search_pattern("Vowels in {}"));
    assert!(!finds(&pattern, source), "unexpected match in {source:?}");
}

#[rstest]
#[case::pipe_table("* Given a table\n|a|b|\n")]
#[case::indented_pipe_table("* Given a table\n   |id | name|\n   |1  | x   |\n")]
#[case::table_marker("* Given a table <table>\n")]
#[case::attribute_with_marker("[Step(\"Given a table <table>\")]\n")]
fn table_step_pattern_accepts_trailing_table(#[case] source: &str) {
    let (stripped, _) = strip_table_marker("Given a table <table>");
    let pattern = compile(&build_search_pattern(stripped));
    assert!(finds(&pattern, source), "expected a match in {source:?}");
}

#[rstest]
#[case::quoted("\"abc\"", true)]
#[case::angled("<word>", true)]
#[case::table_marker("<table>", false)]
#[case::bare("abc", false)]
fn placeholder_accepts_values_but_not_table_marker(#[case] value: &str, #[case] expected: bool) {
    let placeholder = compile(&format!("^{PLACEHOLDER_PATTERN}$"));
    assert_eq!(finds(&placeholder, value), expected);
}

#[test]
fn table_marker_is_not_taken_for_a_parameter() {
    let pattern = compile(&build_search_pattern("Say {}"));
    assert!(!finds(&pattern, "* Say <table>\n"));
    assert!(finds(&pattern, "* Say \"hi\" <table>\n"));
}

#[test]
fn literal_metacharacters_match_only_themselves() {
    let pattern = compile(&build_search_pattern("Pay $5.00 (cash)?"));
    assert!(finds(&pattern, "* Pay $5.00 (cash)?\n"));
    assert!(!finds(&pattern, "* Pay $5X00 cash\n"));
}
