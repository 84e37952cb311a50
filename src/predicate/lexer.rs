//! Tokenizer for condition expressions.
//!
//! Lexing is position-aware: an operand is the whole run of non-whitespace
//! text after an operator, so patterns such as `\A(Red|Sun)` or `a>b` are
//! never split into further tokens.
use std::fmt;

use crate::error::{ResolveError, Result};

/// Comparison operator between an attribute and its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`
    Equal,
    /// `=~`
    Match,
    /// `!~`
    NotMatch,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
}

impl Operator {
    /// Longest symbols first so `>=` is never read as `>`.
    const SYMBOLS: [(&'static str, Self); 7] = [
        (">=", Self::GreaterOrEqual),
        ("<=", Self::LessOrEqual),
        ("==", Self::Equal),
        ("=~", Self::Match),
        ("!~", Self::NotMatch),
        (">", Self::Greater),
        ("<", Self::Less),
    ];

    /// Source symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::Match => "=~",
            Self::NotMatch => "!~",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Clause connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// `and`
    And,
    /// `or`
    Or,
}

/// One lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Fact name or `group`.
    Attribute(&'a str),
    /// Comparison operator.
    Operator(Operator),
    /// Right-hand side of a clause.
    Operand(&'a str),
    /// `and` / `or`.
    Connector(Connector),
}

/// Characters that end an attribute name because they start an operator.
const OPERATOR_START: &[char] = &['=', '!', '<', '>'];

#[derive(Clone, Copy)]
enum Expect {
    Attribute,
    Operator,
    Operand,
    Connector,
}

/// Split `expression` into tokens.
///
/// # Errors
///
/// Returns [`ResolveError::MalformedPredicate`] when the text does not follow
/// `attr op operand (connector attr op operand)*`.
pub fn tokenize(expression: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = expression.trim_start();
    let mut expect = Expect::Attribute;

    if rest.is_empty() {
        return Err(ResolveError::malformed(expression, "empty expression"));
    }

    while !rest.is_empty() {
        match expect {
            Expect::Attribute => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || OPERATOR_START.contains(&c))
                    .unwrap_or(rest.len());
                let (word, tail) = rest.split_at(end);
                if word.is_empty() {
                    return Err(ResolveError::malformed(
                        expression,
                        format!("expected attribute name at '{rest}'"),
                    ));
                }
                tokens.push(Token::Attribute(word));
                rest = tail;
                expect = Expect::Operator;
            }
            Expect::Operator => {
                let Some((symbol, op)) = Operator::SYMBOLS
                    .iter()
                    .find(|(symbol, _)| rest.starts_with(symbol))
                else {
                    return Err(ResolveError::malformed(
                        expression,
                        format!("expected operator at '{rest}'"),
                    ));
                };
                tokens.push(Token::Operator(*op));
                rest = rest.get(symbol.len()..).unwrap_or_default();
                expect = Expect::Operand;
            }
            Expect::Operand => {
                let (word, tail) = split_word(rest);
                tokens.push(Token::Operand(word));
                rest = tail;
                expect = Expect::Connector;
            }
            Expect::Connector => {
                let (word, tail) = split_word(rest);
                let connector = match word {
                    "and" => Connector::And,
                    "or" => Connector::Or,
                    other => {
                        return Err(ResolveError::malformed(
                            expression,
                            format!("expected 'and' or 'or', found '{other}'"),
                        ));
                    }
                };
                tokens.push(Token::Connector(connector));
                rest = tail;
                expect = Expect::Attribute;
            }
        }
        rest = rest.trim_start();
    }

    match expect {
        Expect::Connector => Ok(tokens),
        Expect::Operator => Err(ResolveError::malformed(expression, "missing operator")),
        Expect::Operand => Err(ResolveError::malformed(expression, "missing operand")),
        Expect::Attribute => Err(ResolveError::malformed(
            expression,
            "dangling connector at end of expression",
        )),
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    text.split_at(end)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_around_operator_is_insignificant() {
        let expected = vec![
            Token::Attribute("group"),
            Token::Operator(Operator::Equal),
            Token::Operand("one"),
        ];
        assert_eq!(tokenize("group == one").unwrap(), expected);
        assert_eq!(tokenize("group ==one").unwrap(), expected);
        assert_eq!(tokenize("group==one").unwrap(), expected);
        assert_eq!(tokenize("  group==  one  ").unwrap(), expected);
    }

    #[test]
    fn longest_operator_wins() {
        let tokens = tokenize("release>=6.5").unwrap();
        assert_eq!(tokens[1], Token::Operator(Operator::GreaterOrEqual));
        assert_eq!(tokens[2], Token::Operand("6.5"));
    }

    #[test]
    fn operand_keeps_operator_characters() {
        let tokens = tokenize(r"operatingsystem =~ \A(Red|Sun)=x").unwrap();
        assert_eq!(tokens[2], Token::Operand(r"\A(Red|Sun)=x"));
    }

    #[test]
    fn connectors_are_tokenized() {
        let tokens = tokenize("a == 1 and b =~ x or c < 2").unwrap();
        assert_eq!(tokens.len(), 11);
        assert_eq!(tokens[3], Token::Connector(Connector::And));
        assert_eq!(tokens[7], Token::Connector(Connector::Or));
    }

    #[test]
    fn malformed_inputs() {
        for bad in [
            "",
            "   ",
            "group",
            "group ==",
            "group one",
            "== one",
            "group == one and",
            "group == one xor group == two",
        ] {
            assert!(
                matches!(tokenize(bad), Err(ResolveError::MalformedPredicate { .. })),
                "expected malformed: {bad:?}"
            );
        }
    }
}
