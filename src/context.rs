//! Node context: the facts and group memberships predicates are evaluated against.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute name that resolves to the group membership list instead of a fact.
pub const GROUP_ATTRIBUTE: &str = "group";

/// Read-only facts and group memberships of one node.
///
/// A `Context` is passed explicitly into every predicate evaluation; the
/// engine holds no ambient node state. It is cheap to share between worker
/// threads behind an `Arc` or by reference.
///
/// # Examples
///
/// ```
/// use manifest_resolver::context::Context;
///
/// let ctx = Context::default()
///     .with_fact("operatingsystem", "RedHat")
///     .with_group("web");
///
/// assert_eq!(ctx.comparables("operatingsystem"), ["RedHat"]);
/// assert_eq!(ctx.comparables("group"), ["web"]);
/// assert!(ctx.comparables("kernel").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Fact name to value.
    #[serde(default)]
    pub facts: BTreeMap<String, String>,
    /// Group memberships in the order the provider supplied them.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Context {
    /// Create a context from facts and groups.
    #[must_use]
    pub const fn new(facts: BTreeMap<String, String>, groups: Vec<String>) -> Self {
        Self { facts, groups }
    }

    /// Add or replace a fact.
    #[must_use]
    pub fn with_fact(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(name.into(), value.into());
        self
    }

    /// Append a group membership.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Look up a single fact.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&str> {
        self.facts.get(name).map(String::as_str)
    }

    /// Whether the node belongs to `group`.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// The values an attribute is compared against.
    ///
    /// `group` yields every group membership; any other name yields the fact
    /// value, or nothing when the fact is absent.
    #[must_use]
    pub fn comparables(&self, attribute: &str) -> Vec<&str> {
        if attribute == GROUP_ATTRIBUTE {
            self.groups.iter().map(String::as_str).collect()
        } else {
            self.fact(attribute).into_iter().collect()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn redhat() -> Context {
        Context::default()
            .with_fact("operatingsystem", "RedHat")
            .with_group("one")
            .with_group("two")
    }

    #[test]
    fn group_attribute_yields_all_groups_in_order() {
        assert_eq!(redhat().comparables("group"), ["one", "two"]);
    }

    #[test]
    fn fact_attribute_yields_single_value() {
        assert_eq!(redhat().comparables("operatingsystem"), ["RedHat"]);
    }

    #[test]
    fn absent_fact_yields_nothing() {
        assert!(redhat().comparables("architecture").is_empty());
    }

    #[test]
    fn membership_is_set_containment() {
        let ctx = redhat();
        assert!(ctx.in_group("two"));
        assert!(!ctx.in_group("three"));
    }

    #[test]
    fn with_fact_replaces_existing_value() {
        let ctx = redhat().with_fact("operatingsystem", "SunOS");
        assert_eq!(ctx.fact("operatingsystem"), Some("SunOS"));
    }

    #[test]
    fn deserializes_from_json() {
        let ctx: Context =
            serde_json::from_str(r#"{"facts":{"kernel":"Linux"},"groups":["db"]}"#).unwrap();
        assert_eq!(ctx.fact("kernel"), Some("Linux"));
        assert_eq!(ctx.groups, ["db"]);
    }
}
