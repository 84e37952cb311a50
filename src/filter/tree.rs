//! Conditional-branch filter for generic-tree manifests.
//!
//! A map key of the form `where <expression>` is a conditional key. Its value
//! takes the key's position when the expression holds:
//!
//! - a map made only of conditional keys is a *guarded value*. Its true
//!   branches that guard mappings are spliced together in order; a scalar or
//!   list takes the value of the first true branch. It disappears when none
//!   holds;
//! - beside ordinary keys, a true conditional key must guard a mapping, whose
//!   entries are spliced in at the key's position;
//! - map entries and list elements that resolve to nothing are removed, as
//!   are list elements that were non-empty maps and were emptied by filtering.
//!
//! Every predicate in a map is parsed before any is evaluated, so a malformed
//! expression is reported regardless of which branch the node would take.
use crate::context::Context;
use crate::error::{ResolveError, Result};
use crate::node::{Mapping, Node};
use crate::predicate::Predicate;

/// Prefix that marks a conditional key.
pub const CONDITION_PREFIX: &str = "where ";

/// The expression of a conditional key, or `None` for an ordinary key.
#[must_use]
pub fn condition_of(key: &str) -> Option<&str> {
    key.strip_prefix(CONDITION_PREFIX).map(str::trim)
}

/// Return a copy of `node` with every conditional branch resolved for `ctx`.
///
/// A root that resolves to nothing becomes [`Node::Null`].
///
/// # Errors
///
/// Returns [`ResolveError::MalformedPredicate`] for an unparseable condition
/// and [`ResolveError::InvalidAttribute`] for a conditional key that guards a
/// non-mapping value beside ordinary keys.
pub fn filter_tree(node: &Node, ctx: &Context) -> Result<Node> {
    Ok(resolve(node, ctx)?.unwrap_or(Node::Null))
}

/// [`filter_tree`] for a root mapping.
///
/// # Errors
///
/// As [`filter_tree`]; additionally [`ResolveError::InvalidAttribute`] when
/// the root collapses to something other than a mapping.
pub fn filter_mapping(map: &Mapping, ctx: &Context) -> Result<Mapping> {
    match resolve_map(map, ctx)? {
        None => Ok(Mapping::new()),
        Some(Node::Map(resolved)) => Ok(resolved),
        Some(_) => Err(ResolveError::invalid_attribute(
            "document",
            "where",
            "the document root must resolve to a mapping",
        )),
    }
}

fn resolve(node: &Node, ctx: &Context) -> Result<Option<Node>> {
    match node {
        Node::Map(map) => resolve_map(map, ctx),
        Node::List(items) => Ok(Some(Node::List(resolve_list(items, ctx)?))),
        leaf => Ok(Some(leaf.clone())),
    }
}

fn resolve_map(map: &Mapping, ctx: &Context) -> Result<Option<Node>> {
    let predicates = map
        .keys()
        .map(|key| condition_of(key).map(Predicate::parse).transpose())
        .collect::<Result<Vec<_>>>()?;

    let guarded_value = !map.is_empty() && predicates.iter().all(Option::is_some);
    if guarded_value {
        return resolve_guarded(map, &predicates, ctx);
    }

    let mut out = Mapping::with_capacity(map.len());
    for ((key, value), predicate) in map.iter().zip(&predicates) {
        match predicate {
            None => {
                if let Some(resolved) = resolve(value, ctx)? {
                    out.insert(key.clone(), resolved);
                }
            }
            Some(predicate) if predicate.holds(ctx) => match resolve(value, ctx)? {
                Some(Node::Map(entries)) => out.extend(entries),
                None => {}
                Some(_) => {
                    return Err(ResolveError::invalid_attribute(
                        "mapping",
                        key.clone(),
                        "a conditional key beside ordinary keys must guard a mapping",
                    ));
                }
            },
            Some(_) => {}
        }
    }
    Ok(Some(Node::Map(out)))
}

fn resolve_guarded(
    map: &Mapping,
    predicates: &[Option<Predicate>],
    ctx: &Context,
) -> Result<Option<Node>> {
    let mut chosen: Option<Node> = None;
    for ((key, value), predicate) in map.iter().zip(predicates) {
        if !predicate.as_ref().is_some_and(|p| p.holds(ctx)) {
            continue;
        }
        let Some(resolved) = resolve(value, ctx)? else {
            continue;
        };
        chosen = match (chosen, resolved) {
            (None, resolved) => Some(resolved),
            (Some(Node::Map(mut merged)), Node::Map(entries)) => {
                merged.extend(entries);
                Some(Node::Map(merged))
            }
            (Some(first), later) if first.as_map().is_none() && later.as_map().is_none() => {
                Some(first)
            }
            _ => {
                return Err(ResolveError::invalid_attribute(
                    "mapping",
                    key.clone(),
                    "true branches of a guarded value must all guard mappings or none may",
                ));
            }
        };
    }
    Ok(chosen)
}

fn resolve_list(items: &[Node], ctx: &Context) -> Result<Vec<Node>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match resolve(item, ctx)? {
            None => {}
            Some(resolved) if resolved.is_empty_map() && !item.is_empty_map() => {}
            Some(resolved) => out.push(resolved),
        }
    }
    Ok(out)
}
