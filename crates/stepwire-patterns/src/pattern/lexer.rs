//! Split parsed step values into literal runs and parameter slots.

use super::PLACEHOLDER;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Literal(String),
    Placeholder,
}

pub(crate) fn lex_step_value(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while let Some((literal, tail)) = rest.split_once(PLACEHOLDER) {
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal.to_owned()));
        }
        tokens.push(Token::Placeholder);
        rest = tail;
    }

    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_owned()));
    }
    tokens
}
