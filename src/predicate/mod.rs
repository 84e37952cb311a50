//! Predicate language over node facts and groups.
//!
//! Two entry points share one comparison core:
//!
//! - [`evaluate`] parses a condition expression such as
//!   `operatingsystem =~ Red and group == web` (generic-tree `where` keys).
//! - [`matches`] tests one attribute against a value expression such as
//!   `!/\ASun/` (element-tree guard attributes).

mod expr;
mod lexer;
mod matcher;

pub use expr::{Clause, Expr, Predicate, evaluate};
pub use lexer::{Connector, Operator, Token, tokenize};
pub use matcher::{Matcher, VersionOp, compare_versions, matches};
