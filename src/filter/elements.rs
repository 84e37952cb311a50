//! Attribute filter for element-tree manifests.
//!
//! Every attribute on a non-root element is a guard: the attribute name is
//! the fact (or `group`) and its value is a single-attribute value expression.
//! An element survives only when all of its guards hold.
use crate::context::Context;
use crate::element::Element;
use crate::error::Result;
use crate::predicate::Matcher;

/// Prune `root` in place, dropping every descendant whose guards do not all
/// hold for `ctx`. Returns the number of elements removed (subtrees count once).
///
/// The root's own attributes are document metadata (`filename`,
/// `commandname`) and are never evaluated.
///
/// # Errors
///
/// Returns [`crate::ResolveError::MalformedPredicate`] if any guard on a
/// visited element has an invalid pattern, even when an earlier guard on the
/// same element already failed.
pub fn filter_elements(root: &mut Element, ctx: &Context) -> Result<usize> {
    let mut removed = 0;
    prune_children(root, ctx, &mut removed)?;
    Ok(removed)
}

fn prune_children(parent: &mut Element, ctx: &Context, removed: &mut usize) -> Result<()> {
    let children = std::mem::take(&mut parent.children);
    parent.children.reserve(children.len());
    for mut child in children {
        if guards_hold(&child, ctx)? {
            prune_children(&mut child, ctx, removed)?;
            parent.children.push(child);
        } else {
            tracing::trace!(element = %child.name, "guard failed, dropping element");
            *removed += 1;
        }
    }
    Ok(())
}

fn guards_hold(element: &Element, ctx: &Context) -> Result<bool> {
    let matchers = element
        .attributes
        .iter()
        .map(|(name, value)| Matcher::parse(value).map(|m| (name.as_str(), m)))
        .collect::<Result<Vec<_>>>()?;
    Ok(matchers.iter().all(|(name, m)| m.test(name, ctx)))
}
