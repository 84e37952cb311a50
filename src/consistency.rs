//! Detecting non-deterministic resolution across repeated attempts.
use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::node::{Mapping, Node};

/// Whether `values` holds at least two distinct values.
///
/// Absent values are modelled as `None` and count as distinct from any
/// present value.
///
/// ```
/// use manifest_resolver::consistency::is_inconsistent;
///
/// assert!(!is_inconsistent::<i32>(&[]));
/// assert!(!is_inconsistent(&[1, 1, 1]));
/// assert!(is_inconsistent(&[Some(1), Some(1), None]));
/// ```
#[must_use]
pub fn is_inconsistent<T: PartialEq>(values: &[T]) -> bool {
    values
        .split_first()
        .is_some_and(|(first, rest)| rest.iter().any(|value| value != first))
}

/// Stable SHA-256 hex digest of a canonical mapping.
///
/// Mapping keys are sorted at every depth before hashing, so two mappings
/// that compare equal always share a fingerprint.
#[must_use]
pub fn fingerprint(mapping: &Mapping) -> String {
    let canonical = sorted_map(mapping);
    // Only strings, booleans and nulls reach the serializer, so JSON encoding
    // does not fail in practice. The debug rendering is still key-sorted.
    let bytes = match serde_json::to_vec(&canonical) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("fingerprint falling back to debug rendering: {e}");
            format!("{canonical:?}").into_bytes()
        }
    };
    let digest = Sha256::digest(&bytes);
    let mut hex = String::with_capacity(64);
    for byte in &digest {
        // write! to a String is infallible; unwrap_or(()) makes that explicit.
        write!(hex, "{byte:02x}").unwrap_or(());
    }
    hex
}

/// JSON-serializable view with mapping keys in sorted order.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Sorted {
    Leaf(Node),
    List(Vec<Sorted>),
    Map(std::collections::BTreeMap<String, Sorted>),
}

fn sorted(node: &Node) -> Sorted {
    match node {
        Node::List(items) => Sorted::List(items.iter().map(sorted).collect()),
        Node::Map(map) => sorted_map(map),
        leaf => Sorted::Leaf(leaf.clone()),
    }
}

fn sorted_map(map: &Mapping) -> Sorted {
    Sorted::Map(map.iter().map(|(k, v)| (k.clone(), sorted(v))).collect())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_single_are_consistent() {
        assert!(!is_inconsistent::<u8>(&[]));
        assert!(!is_inconsistent(&[1]));
        assert!(!is_inconsistent(&[1, 1, 1]));
    }

    #[test]
    fn any_disagreement_is_inconsistent() {
        assert!(is_inconsistent(&[1, 2, 1]));
        assert!(is_inconsistent(&[1, 1, 2]));
        assert!(is_inconsistent(&[Some(1), Some(1), None]));
    }

    #[test]
    fn mappings_compare_structurally() {
        let a: Mapping = [("x".to_string(), Node::from("1"))].into_iter().collect();
        let b = a.clone();
        let mut c = a.clone();
        c.insert("y".to_string(), Node::from(true));
        assert!(!is_inconsistent(&[a.clone(), b]));
        assert!(is_inconsistent(&[a, c]));
    }

    #[test]
    fn fingerprint_ignores_key_order() {
        let a: Mapping = [
            ("depend".to_string(), Node::from(vec![Node::from("x")])),
            ("revert".to_string(), Node::from(true)),
        ]
        .into_iter()
        .collect();
        let b: Mapping = a.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn fingerprint_distinguishes_values() {
        let a: Mapping = [("x".to_string(), Node::from("1"))].into_iter().collect();
        let b: Mapping = [("x".to_string(), Node::from("2"))].into_iter().collect();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_hashes_sorted_json_of_nested_values() {
        let file: Mapping = [
            ("owner".to_string(), Node::from("root")),
            ("group".to_string(), Node::Null),
        ]
        .into_iter()
        .collect();
        let mapping: Mapping = [
            ("revert".to_string(), Node::from(true)),
            ("file".to_string(), Node::from(file)),
            ("depend".to_string(), Node::from(vec![Node::from("x")])),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            serde_json::to_string(&sorted_map(&mapping)).unwrap(),
            r#"{"depend":["x"],"file":{"group":null,"owner":"root"},"revert":true}"#
        );
        assert_eq!(
            fingerprint(&mapping),
            "f4061d1f7d4248a4e7cdb420d0aa39460293d621f7f667de007439733408d4a7"
        );
    }

    #[test]
    fn fingerprint_of_empty_mapping_is_stable() {
        assert_eq!(
            fingerprint(&Mapping::new()),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }
}
