//! Filters that narrow a manifest to what applies to one node.
//!
//! - [`tree`]: resolves `where` branches in generic-tree documents.
//! - [`elements`]: prunes guarded elements in element-tree documents.
//! - [`keys`]: restricts a canonical mapping to an allow-list of keys.

pub mod elements;
pub mod keys;
pub mod tree;

pub use elements::filter_elements;
pub use keys::{ALWAYS_KEPT, filter, filter_completely};
pub use tree::{condition_of, filter_mapping, filter_tree};
