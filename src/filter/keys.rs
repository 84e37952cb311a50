//! Allow-list key filter for resolved manifests.
//!
//! Both operations are shallow: only top-level keys are considered, and the
//! surviving entries keep their values and relative order.
use crate::node::Mapping;

/// Keys [`filter`] always retains.
pub const ALWAYS_KEPT: [&str; 2] = ["depend", "post"];

/// Retain only the keys listed in `keep`.
///
/// # Examples
///
/// ```
/// use manifest_resolver::filter::filter_completely;
/// use manifest_resolver::node::{Mapping, Node};
///
/// let mut m: Mapping = [("depend", true), ("post", false), ("x", true)]
///     .into_iter()
///     .map(|(k, v)| (k.to_string(), Node::from(v)))
///     .collect();
/// filter_completely(&mut m, &[]);
/// assert!(m.is_empty());
/// ```
pub fn filter_completely<'m>(mapping: &'m mut Mapping, keep: &[&str]) -> &'m mut Mapping {
    mapping.retain(|key, _| keep.contains(&key.as_str()));
    mapping
}

/// Retain [`ALWAYS_KEPT`] plus the keys listed in `keep`.
pub fn filter<'m>(mapping: &'m mut Mapping, keep: &[&str]) -> &'m mut Mapping {
    mapping.retain(|key, _| ALWAYS_KEPT.contains(&key.as_str()) || keep.contains(&key.as_str()));
    mapping
}
