//! Convert lexed tokens into the body of a declaration search pattern.

use super::PLACEHOLDER_PATTERN;
use super::lexer::Token;

/// Render tokens as a regular-expression fragment.
///
/// Literal runs are escaped so that punctuation in step text matches itself.
pub(crate) fn compile_body(tokens: &[Token]) -> String {
    let capacity = tokens.iter().fold(0usize, |acc, token| {
        acc.saturating_add(match token {
            Token::Literal(text) => text.len().saturating_mul(2),
            Token::Placeholder => PLACEHOLDER_PATTERN.len(),
        })
    });
    let mut body = String::with_capacity(capacity);

    for token in tokens {
        match token {
            Token::Literal(text) => body.push_str(&regex::escape(text)),
            Token::Placeholder => body.push_str(PLACEHOLDER_PATTERN),
        }
    }
    body
}
