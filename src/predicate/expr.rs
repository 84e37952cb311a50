//! Condition expression tree: recursive-descent parser and evaluator.
//!
//! Chains are parsed left-associatively. Evaluation folds left to right
//! with one extra rule: an `and` that evaluates false vetoes the rest of the
//! chain, so a later `or` cannot revive it.
//!
//! ```text
//! A and B or C   =>  Or(And(A, B), C)
//! A and C or B   =>  false whenever A and C is false
//! ```
//!
//! All-`and` and all-`or` chains are plain conjunction and disjunction.
use std::fmt;

use super::lexer::{Connector, Operator, Token, tokenize};
use super::matcher::{Matcher, VersionOp};
use crate::context::Context;
use crate::error::{ResolveError, Result};

/// One `attr op operand` comparison.
#[derive(Debug, Clone)]
pub struct Clause {
    /// Fact name or `group`.
    pub attribute: String,
    /// Comparison operator as written.
    pub operator: Operator,
    /// Operand text as written.
    pub operand: String,
    matcher: Matcher,
}

impl Clause {
    fn new(expression: &str, attribute: &str, operator: Operator, operand: &str) -> Result<Self> {
        let matcher = match operator {
            Operator::Equal => Matcher::equals(operand),
            Operator::Match => Matcher::pattern_in(expression, operand)?,
            Operator::NotMatch => Matcher::pattern_in(expression, operand)?.negate(),
            Operator::Greater => Matcher::version(VersionOp::Greater, operand),
            Operator::GreaterOrEqual => Matcher::version(VersionOp::GreaterOrEqual, operand),
            Operator::Less => Matcher::version(VersionOp::Less, operand),
            Operator::LessOrEqual => Matcher::version(VersionOp::LessOrEqual, operand),
        };
        Ok(Self {
            attribute: attribute.to_string(),
            operator,
            operand: operand.to_string(),
            matcher,
        })
    }

    /// Whether this clause holds for `ctx`.
    #[must_use]
    pub fn holds(&self, ctx: &Context) -> bool {
        self.matcher.test(&self.attribute, ctx)
    }
}

/// Parsed condition expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Leaf comparison.
    Clause(Clause),
    /// Left conjunct and right clause.
    And(Box<Expr>, Box<Expr>),
    /// Left disjunct and right clause.
    Or(Box<Expr>, Box<Expr>),
}

/// Three-valued evaluation result; `Vetoed` absorbs everything after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Holds,
    Fails,
    Vetoed,
}

impl Outcome {
    const fn from_bool(value: bool) -> Self {
        if value { Self::Holds } else { Self::Fails }
    }
}

impl Expr {
    /// Evaluate against `ctx`.
    #[must_use]
    pub fn evaluate(&self, ctx: &Context) -> bool {
        self.outcome(ctx) == Outcome::Holds
    }

    fn outcome(&self, ctx: &Context) -> Outcome {
        match self {
            Self::Clause(clause) => Outcome::from_bool(clause.holds(ctx)),
            Self::And(left, right) => match left.outcome(ctx) {
                Outcome::Vetoed | Outcome::Fails => Outcome::Vetoed,
                Outcome::Holds => {
                    if right.evaluate(ctx) {
                        Outcome::Holds
                    } else {
                        Outcome::Vetoed
                    }
                }
            },
            Self::Or(left, right) => match left.outcome(ctx) {
                Outcome::Vetoed => Outcome::Vetoed,
                Outcome::Holds => Outcome::Holds,
                Outcome::Fails => Outcome::from_bool(right.evaluate(ctx)),
            },
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clause(c) => write!(f, "{} {} {}", c.attribute, c.operator, c.operand),
            Self::And(l, r) => write!(f, "{l} and {r}"),
            Self::Or(l, r) => write!(f, "{l} or {r}"),
        }
    }
}

/// A condition expression together with its source text.
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    /// Parse `expression` into an expression tree.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MalformedPredicate`] for any syntax error or
    /// invalid regular expression.
    pub fn parse(expression: &str) -> Result<Self> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            expression,
            tokens: tokens.into_iter(),
        };
        let expr = parser.expression()?;
        Ok(Self {
            source: expression.to_string(),
            expr,
        })
    }

    /// Evaluate against `ctx`.
    #[must_use]
    pub fn holds(&self, ctx: &Context) -> bool {
        self.expr.evaluate(ctx)
    }

    /// The source text this predicate was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed tree.
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }
}

struct Parser<'a, I> {
    expression: &'a str,
    tokens: I,
}

impl<'a, I: Iterator<Item = Token<'a>>> Parser<'a, I> {
    // expression := clause (connector clause)*
    fn expression(&mut self) -> Result<Expr> {
        let mut expr = Expr::Clause(self.clause()?);
        while let Some(token) = self.tokens.next() {
            let Token::Connector(connector) = token else {
                return Err(self.unexpected(token));
            };
            let right = Box::new(Expr::Clause(self.clause()?));
            expr = match connector {
                Connector::And => Expr::And(Box::new(expr), right),
                Connector::Or => Expr::Or(Box::new(expr), right),
            };
        }
        Ok(expr)
    }

    // clause := attribute operator operand
    fn clause(&mut self) -> Result<Clause> {
        let attribute = match self.tokens.next() {
            Some(Token::Attribute(a)) => a,
            other => return Err(self.missing("attribute", other)),
        };
        let operator = match self.tokens.next() {
            Some(Token::Operator(op)) => op,
            other => return Err(self.missing("operator", other)),
        };
        let operand = match self.tokens.next() {
            Some(Token::Operand(o)) => o,
            other => return Err(self.missing("operand", other)),
        };
        Clause::new(self.expression, attribute, operator, operand)
    }

    fn missing(&self, what: &str, found: Option<Token<'_>>) -> ResolveError {
        match found {
            Some(token) => ResolveError::malformed(
                self.expression,
                format!("expected {what}, found {token:?}"),
            ),
            None => ResolveError::malformed(self.expression, format!("missing {what}")),
        }
    }

    fn unexpected(&self, token: Token<'_>) -> ResolveError {
        ResolveError::malformed(self.expression, format!("unexpected {token:?}"))
    }
}

/// Parse and evaluate a condition expression in one step.
///
/// # Examples
///
/// ```
/// use manifest_resolver::context::Context;
/// use manifest_resolver::predicate::evaluate;
///
/// let ctx = Context::default().with_fact("operatingsystem", "RedHat");
/// assert!(evaluate("operatingsystem =~ Red", &ctx).unwrap());
/// assert!(!evaluate("operatingsystem !~ Red", &ctx).unwrap());
/// ```
///
/// # Errors
///
/// Returns [`ResolveError::MalformedPredicate`] if the expression does not parse.
pub fn evaluate(expression: &str, ctx: &Context) -> Result<bool> {
    Ok(Predicate::parse(expression)?.holds(ctx))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::default()
            .with_fact("operatingsystem", "RedHat")
            .with_fact("operatingsystemrelease", "6.5")
            .with_group("one")
            .with_group("two")
    }

    fn eval(expression: &str) -> bool {
        evaluate(expression, &ctx()).unwrap()
    }

    #[test]
    fn group_membership() {
        assert!(eval("group == one"));
        assert!(eval("group ==one"));
        assert!(eval("group==one"));
        assert!(!eval("group ==three"));
        assert!(!eval("group==three"));
    }

    #[test]
    fn pattern_operators() {
        assert!(eval("operatingsystem =~ Red"));
        assert!(eval(r"operatingsystem =~ \ARed"));
        assert!(!eval(r"operatingsystem =~ \AHat"));
        assert!(!eval("operatingsystem !~ Red"));
        assert!(eval(r"operatingsystem !~ \AHat"));
        assert!(!eval("operatingsystem !~ Hat"));
    }

    #[test]
    fn version_operators() {
        assert!(eval("operatingsystemrelease == 6.5"));
        assert!(eval("operatingsystemrelease >= 6.5"));
        assert!(eval("operatingsystemrelease > 6.1"));
        assert!(eval("operatingsystemrelease > 6.1.1"));
        assert!(!eval("operatingsystemrelease > 6.5"));
        assert!(eval("operatingsystemrelease <= 6.5"));
        assert!(eval("operatingsystemrelease < 6.9"));
        assert!(!eval("operatingsystemrelease < 6.2"));
    }

    #[test]
    fn chained_conditions() {
        assert!(eval("operatingsystem =~ Red and group == one"));
        assert!(eval("operatingsystem =~ Red or group == three"));
        assert!(!eval("operatingsystem =~ Red and group == three"));
        assert!(eval("operatingsystem =~ Red and group == one or group == three"));
        assert!(!eval("operatingsystem =~ Red and group == three or group == one"));
    }

    #[test]
    fn single_connector_chains_are_plain_logic() {
        assert!(eval("group == one and group == two and operatingsystem == RedHat"));
        assert!(!eval("group == one and group == two and operatingsystem == SunOS"));
        assert!(eval("group == six or group == seven or group == two"));
        assert!(!eval("group == six or group == seven or group == eight"));
    }

    #[test]
    fn or_then_and_folds_left() {
        assert!(eval("group == six or group == one and group == two"));
        assert!(!eval("group == one or group == six and group == seven"));
    }

    #[test]
    fn tree_is_left_associative() {
        let p = Predicate::parse("a == 1 and b == 2 or c == 3").unwrap();
        assert!(matches!(p.expr(), Expr::Or(left, _) if matches!(**left, Expr::And(_, _))));
        assert_eq!(p.expr().to_string(), "a == 1 and b == 2 or c == 3");
    }

    #[test]
    fn bad_regex_operand_is_malformed() {
        let err = evaluate("operatingsystem =~ (Red", &ctx()).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedPredicate { expression, .. }
            if expression == "operatingsystem =~ (Red"));
    }

    #[test]
    fn unparseable_never_fails_soft() {
        assert!(evaluate("foo", &ctx()).is_err());
        assert!(evaluate("group == one or", &ctx()).is_err());
    }
}
