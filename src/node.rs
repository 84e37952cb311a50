//! Generic manifest tree shared by both surface syntaxes.
//!
//! Generic-tree (YAML) documents parse straight into [`Node`]; element-tree
//! (XML) documents are decoded into the same shape by the canonicalizer. A
//! canonical manifest is a [`Mapping`] at the root.
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ResolveError, Result};

/// Insertion-ordered mapping from normalized key to node.
///
/// Equality ignores order; emission order of canonical manifests is governed
/// by the section tables in [`crate::canonical::schema`].
pub type Mapping = IndexMap<String, Node>;

/// One value in a manifest tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    /// Explicit null (`~` in YAML, empty leaf element in XML).
    Null,
    /// Boolean, used for marker attributes.
    Bool(bool),
    /// Any textual or numeric scalar, carried as text.
    Scalar(String),
    /// Ordered sequence.
    List(Vec<Node>),
    /// Nested mapping.
    Map(Mapping),
}

impl Node {
    /// Parse a generic-tree (YAML) document.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Parse`] if `text` is not valid YAML.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| ResolveError::Parse {
                syntax: "yaml",
                origin: origin.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::from_yaml(value))
    }

    /// Convert a parsed YAML value. Numbers become their decimal text and
    /// non-string keys are stringified.
    #[must_use]
    pub fn from_yaml(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Scalar(n.to_string()),
            Value::String(s) => Self::Scalar(s),
            Value::Sequence(items) => Self::List(items.into_iter().map(Self::from_yaml).collect()),
            Value::Mapping(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (yaml_key_text(&k), Self::from_yaml(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::from_yaml(tagged.value),
        }
    }

    /// Text of a scalar node.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Nested mapping, if this is one.
    #[must_use]
    pub const fn as_map(&self) -> Option<&Mapping> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Sequence items, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this node is the boolean `true`.
    #[must_use]
    pub const fn is_true(&self) -> bool {
        matches!(self, Self::Bool(true))
    }

    /// Whether this node is a map with no entries.
    #[must_use]
    pub fn is_empty_map(&self) -> bool {
        matches!(self, Self::Map(m) if m.is_empty())
    }

    /// Render a leaf node as element text. Containers have no text form.
    #[must_use]
    pub fn leaf_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Scalar(s) => Some(s.clone()),
            Self::List(_) | Self::Map(_) => None,
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Self::Scalar(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Self::Scalar(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<Self>> for Node {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl From<Mapping> for Node {
    fn from(map: Mapping) -> Self {
        Self::Map(map)
    }
}

fn yaml_key_text(key: &serde_yaml::Value) -> String {
    use serde_yaml::Value;
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Normalize one mapping key.
///
/// Keys written in symbol form (`:owner`) and plain form (`owner`) normalize
/// to the same key. Normalizing an already-normal key is a no-op.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim_start_matches(':').to_string()
}

/// Normalize every mapping key at every depth, including maps inside lists.
#[must_use]
pub fn normalize_keys(node: Node) -> Node {
    match node {
        Node::Map(map) => Node::Map(normalize_mapping_keys(map)),
        Node::List(items) => Node::List(items.into_iter().map(normalize_keys).collect()),
        leaf => leaf,
    }
}

/// [`normalize_keys`] for a root mapping.
#[must_use]
pub fn normalize_mapping_keys(map: Mapping) -> Mapping {
    map.into_iter()
        .map(|(k, v)| (normalize_key(&k), normalize_keys(v)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Node {
        Node::from_yaml_str(text, "test").unwrap()
    }

    #[test]
    fn numbers_become_text() {
        let node = yaml("file:\n  owner: 0\n  perms: 0644\n");
        let file = node.as_map().unwrap()["file"].as_map().unwrap();
        assert_eq!(file["owner"], Node::from("0"));
        assert!(file["perms"].as_str().is_some());
    }

    #[test]
    fn booleans_and_nulls_survive() {
        let node = yaml("revert: true\nempty: ~\n");
        let map = node.as_map().unwrap();
        assert!(map["revert"].is_true());
        assert_eq!(map["empty"], Node::Null);
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let err = Node::from_yaml_str("a: [unclosed", "bad.yml").unwrap_err();
        assert!(matches!(err, ResolveError::Parse { syntax: "yaml", .. }));
    }

    #[test]
    fn symbol_and_plain_keys_normalize_identically() {
        let a = normalize_keys(yaml(":a:\n  b: 1\n"));
        let b = normalize_keys(yaml("a:\n  :b: 1\n"));
        let c = normalize_keys(yaml("a:\n  b: 1\n"));
        assert_eq!(a, c);
        assert_eq!(b, c);
    }

    #[test]
    fn normalization_reaches_into_lists() {
        let node = normalize_keys(yaml("steps:\n  - :step:\n      :guard: [x]\n"));
        let steps = node.as_map().unwrap()["steps"].as_list().unwrap();
        let step = steps[0].as_map().unwrap();
        assert!(step.contains_key("step"));
        assert!(step["step"].as_map().unwrap().contains_key("guard"));
    }

    #[test]
    fn deep_normalization_is_idempotent() {
        let once = normalize_keys(yaml(":a:\n  - :b: {:c: 1}\n  - d\n::e: f\n"));
        let twice = normalize_keys(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn serializes_untagged() {
        let node = yaml("a: [1, true, ~]\n");
        assert_eq!(
            serde_json::to_string(&node).unwrap(),
            r#"{"a":["1",true,null]}"#
        );
    }
}
