//! Single-attribute predicate primitive.
//!
//! A value expression tests one attribute (a fact name or `group`) of a
//! [`Context`]:
//!
//! | form          | meaning                                   |
//! |---------------|-------------------------------------------|
//! | `!expr`       | negation of `expr`                        |
//! | `/regex/`     | any comparable matches the regex          |
//! | `>=6.5`, `<7` | dotted-version comparison                 |
//! | `RedHat`      | any comparable equals the token           |
//!
//! Element-tree guard attributes use this form directly; every clause of a
//! condition expression compiles to the same [`Matcher`].
use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::context::Context;
use crate::error::{ResolveError, Result};

/// Version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
}

impl VersionOp {
    /// Prefix forms, longest first so `>=` wins over `>`.
    const PREFIXES: [(&'static str, Self); 4] = [
        (">=", Self::GreaterOrEqual),
        ("<=", Self::LessOrEqual),
        (">", Self::Greater),
        ("<", Self::Less),
    ];

    const fn admits(self, ordering: Ordering) -> bool {
        match self {
            Self::Greater => matches!(ordering, Ordering::Greater),
            Self::GreaterOrEqual => !matches!(ordering, Ordering::Less),
            Self::Less => matches!(ordering, Ordering::Less),
            Self::LessOrEqual => !matches!(ordering, Ordering::Greater),
        }
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }
}

/// What a matcher checks each comparable value against.
#[derive(Debug, Clone)]
enum Test {
    Equals(String),
    Pattern(Regex),
    Version(VersionOp, String),
}

impl Test {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::Pattern(re) => re.is_match(value),
            Self::Version(op, operand) => op.admits(compare_versions(value, operand)),
        }
    }
}

/// A compiled single-attribute test.
#[derive(Debug, Clone)]
pub struct Matcher {
    negated: bool,
    test: Test,
}

impl Matcher {
    /// Compile a value expression (`!`, `/regex/`, `>=x`, or a plain token).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MalformedPredicate`] if a `/…/` pattern is not
    /// a valid regular expression.
    pub fn parse(value_expr: &str) -> Result<Self> {
        if let Some(rest) = value_expr.strip_prefix('!') {
            return Ok(Self::parse(rest)?.negate());
        }
        if let Some(pattern) = value_expr
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            return Self::pattern(pattern);
        }
        for (prefix, op) in VersionOp::PREFIXES {
            if let Some(operand) = value_expr.strip_prefix(prefix) {
                return Ok(Self::version(op, operand));
            }
        }
        Ok(Self::equals(value_expr))
    }

    /// Exact equality against any comparable.
    #[must_use]
    pub fn equals(expected: &str) -> Self {
        Self {
            negated: false,
            test: Test::Equals(expected.to_string()),
        }
    }

    /// Regular-expression match against any comparable.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MalformedPredicate`] for an invalid pattern.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Self::pattern_in(pattern, pattern)
    }

    /// [`Matcher::pattern`], reporting errors against the enclosing expression.
    pub(super) fn pattern_in(expression: &str, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| ResolveError::malformed(expression, format!("invalid regex: {e}")))?;
        Ok(Self {
            negated: false,
            test: Test::Pattern(re),
        })
    }

    /// Dotted-version comparison against any comparable.
    #[must_use]
    pub fn version(op: VersionOp, operand: &str) -> Self {
        Self {
            negated: false,
            test: Test::Version(op, operand.to_string()),
        }
    }

    /// Invert the result of this matcher.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Test `attribute` of `ctx`.
    ///
    /// True when any comparable value passes (an absent fact has none, so an
    /// un-negated test of it is always false).
    #[must_use]
    pub fn test(&self, attribute: &str, ctx: &Context) -> bool {
        let hit = ctx
            .comparables(attribute)
            .into_iter()
            .any(|value| self.test.accepts(value));
        hit != self.negated
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        match &self.test {
            Test::Equals(expected) => write!(f, "{expected}"),
            Test::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Test::Version(op, operand) => write!(f, "{}{operand}", op.symbol()),
        }
    }
}

/// Evaluate a single-attribute value expression against `ctx`.
///
/// # Examples
///
/// ```
/// use manifest_resolver::context::Context;
/// use manifest_resolver::predicate::matches;
///
/// let ctx = Context::default()
///     .with_fact("operatingsystemrelease", "6.5")
///     .with_group("one");
///
/// assert!(matches("group", "one", &ctx).unwrap());
/// assert!(matches("group", "!three", &ctx).unwrap());
/// assert!(matches("operatingsystemrelease", ">6.1.1", &ctx).unwrap());
/// ```
///
/// # Errors
///
/// Returns [`ResolveError::MalformedPredicate`] for an invalid `/…/` pattern.
pub fn matches(attribute: &str, value_expr: &str, ctx: &Context) -> Result<bool> {
    Ok(Matcher::parse(value_expr)?.test(attribute, ctx))
}

/// Compare two dotted version strings component by component.
///
/// Each component compares as an integer (its leading digit run, 0 when it
/// has none); the shorter version is padded with zeros.
#[must_use]
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left: Vec<u64> = left.split('.').map(component_value).collect();
    let right: Vec<u64> = right.split('.').map(component_value).collect();
    let len = left.len().max(right.len());
    (0..len)
        .map(|i| {
            let a = left.get(i).copied().unwrap_or(0);
            let b = right.get(i).copied().unwrap_or(0);
            a.cmp(&b)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn component_value(component: &str) -> u64 {
    let digits: String = component
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(u64::MAX)
    }
}
