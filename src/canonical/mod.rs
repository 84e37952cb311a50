//! Canonical form of resource and command manifests.
//!
//! Element-tree documents are decoded and generic-tree documents normalized
//! into the same [`Mapping`] shape, so every later stage sees one form
//! regardless of surface syntax. The reverse direction renders a canonical
//! mapping back to an element tree for shipping to nodes.
//!
//! ```text
//! <config>                               revert: true
//!   <revert/>                            depend: [a, b]
//!   <depend>a</depend>                   file:
//!   <depend>b</depend>          <=>        owner: root
//!   <file>                                 plain: motd
//!     <owner>root</owner>                post_once: [x]
//!     <source><plain>motd</plain></source>
//!   </file>
//!   <post><exec_once>x</exec_once></post>
//! </config>
//! ```

pub mod command;
pub mod resource;
pub mod schema;

pub use schema::Audience;

use crate::element::Element;
use crate::node::{Mapping, Node};

/// Append `node` to the list under `key`, creating the list if needed.
fn push(out: &mut Mapping, key: &str, node: Node) {
    match out.get_mut(key) {
        Some(Node::List(items)) => items.push(node),
        _ => {
            out.insert(key.to_string(), Node::List(vec![node]));
        }
    }
}

/// Generic-tree list section: a lone scalar becomes a one-element list and a
/// null section disappears.
fn normalize_list(value: Node) -> Option<Node> {
    match value {
        Node::Null => None,
        list @ Node::List(_) => Some(list),
        single => Some(Node::List(vec![single])),
    }
}

/// Generic-tree marker: `false` and null markers disappear.
fn normalize_marker(value: Node) -> Option<Node> {
    match value {
        Node::Null | Node::Bool(false) => None,
        other => Some(other),
    }
}

/// Whether `value` is a list of leaf values.
fn is_leaf_list(value: &Node) -> bool {
    value
        .as_list()
        .is_some_and(|items| items.iter().all(|item| item.leaf_text().is_some()))
}

/// Texts of a list section (a lone leaf counts as one item).
fn leaves(value: &Node) -> Vec<String> {
    match value {
        Node::List(items) => items.iter().filter_map(Node::leaf_text).collect(),
        other => other.leaf_text().into_iter().collect(),
    }
}

/// Decode an element no table knows about: leaves become text, containers
/// become mappings, and repeated child names accumulate into lists.
fn decode_generic(element: &Element) -> Node {
    if element.children.is_empty() {
        return Node::Scalar(element.text.clone());
    }
    let mut out = Mapping::new();
    for child in &element.children {
        let value = decode_generic(child);
        match out.get_mut(&child.name) {
            Some(Node::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, Node::Null);
                *existing = Node::List(vec![first, value]);
            }
            None => {
                out.insert(child.name.clone(), value);
            }
        }
    }
    Node::Map(out)
}

/// Encode a key no table knows about. Lists repeat the element.
fn encode_generic(key: &str, value: &Node) -> Vec<Element> {
    match value {
        Node::List(items) => items
            .iter()
            .flat_map(|item| encode_generic(key, item))
            .collect(),
        Node::Map(map) => {
            let mut element = Element::new(key);
            for (k, v) in map {
                element.children.extend(encode_generic(k, v));
            }
            vec![element]
        }
        leaf => vec![Element::leaf(key, leaf.leaf_text().unwrap_or_default())],
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn push_accumulates_in_order() {
        let mut m = Mapping::new();
        push(&mut m, "depend", Node::from("a"));
        push(&mut m, "depend", Node::from("b"));
        assert_eq!(m["depend"], Node::List(vec![Node::from("a"), Node::from("b")]));
    }

    #[test]
    fn list_normalization() {
        assert_eq!(
            normalize_list(Node::from("x")),
            Some(Node::List(vec![Node::from("x")]))
        );
        assert_eq!(normalize_list(Node::Null), None);
        assert_eq!(
            normalize_list(Node::List(vec![])),
            Some(Node::List(vec![]))
        );
    }

    #[test]
    fn marker_normalization() {
        assert_eq!(normalize_marker(Node::Bool(false)), None);
        assert_eq!(normalize_marker(Node::Null), None);
        assert_eq!(normalize_marker(Node::Bool(true)), Some(Node::Bool(true)));
    }

    #[test]
    fn generic_decode_collects_repeats() {
        let element = Element::new("extra")
            .with_child(Element::leaf("item", "a"))
            .with_child(Element::leaf("item", "b"))
            .with_child(Element::leaf("note", "c"));
        let node = decode_generic(&element);
        let map = node.as_map().unwrap();
        assert_eq!(map["item"], Node::List(vec![Node::from("a"), Node::from("b")]));
        assert_eq!(map["note"], Node::from("c"));
    }

    #[test]
    fn generic_encode_repeats_list_items() {
        let value = Node::List(vec![Node::from("a"), Node::from("b")]);
        let elements = encode_generic("item", &value);
        assert_eq!(elements, [Element::leaf("item", "a"), Element::leaf("item", "b")]);
    }
}
