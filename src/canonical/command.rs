//! Command manifest canonicalization.
//!
//! ```text
//! depend: [..]
//! dependfile: [..]
//! steps:
//!   - step: {guard: [exec..], command: [exec..]}
//! ```
use tracing::warn;

use super::{decode_generic, encode_generic, is_leaf_list, leaves, normalize_list, push};
use crate::element::Element;
use crate::error::{ResolveError, Result};
use crate::node::{Mapping, Node};

/// Root element of a command manifest.
pub const ROOT: &str = "commands";

/// Root attribute naming the command.
pub const COMMANDNAME_ATTRIBUTE: &str = "commandname";

const DEPEND_LISTS: [&str; 2] = ["depend", "dependfile"];
const STEPS: &str = "steps";
const STEP: &str = "step";
const PHASES: [&str; 2] = ["guard", "command"];
const EXEC: &str = "exec";

/// Decode a (filtered) element-tree command manifest.
///
/// # Errors
///
/// In strict mode, returns [`ResolveError::InvalidAttribute`] for an element
/// that is not part of the command layout.
pub fn from_element(root: &Element, strict: bool) -> Result<Mapping> {
    let mut out = Mapping::new();
    for child in &root.children {
        let name = child.name.as_str();
        if DEPEND_LISTS.contains(&name) {
            push(&mut out, name, Node::from(child.text.as_str()));
        } else if name == STEP {
            let step = decode_step(child, strict)?;
            push(&mut out, STEPS, wrap_step(step));
        } else if strict {
            return Err(ResolveError::invalid_attribute(ROOT, name, "unknown section"));
        } else {
            out.insert(name.to_string(), decode_generic(child));
        }
    }
    Ok(out)
}

fn wrap_step(step: Mapping) -> Node {
    let mut wrapper = Mapping::with_capacity(1);
    wrapper.insert(STEP.to_string(), Node::Map(step));
    Node::Map(wrapper)
}

fn empty_step() -> Mapping {
    PHASES
        .iter()
        .map(|phase| ((*phase).to_string(), Node::List(Vec::new())))
        .collect()
}

fn decode_step(step: &Element, strict: bool) -> Result<Mapping> {
    let mut out = empty_step();
    for phase in &step.children {
        if !PHASES.contains(&phase.name.as_str()) {
            if strict {
                return Err(ResolveError::invalid_attribute(
                    STEP,
                    phase.name.as_str(),
                    "expected guard or command",
                ));
            }
            warn!(element = %phase.name, "ignoring unknown step element");
            continue;
        }
        for exec in &phase.children {
            if exec.name == EXEC {
                push(&mut out, &phase.name, Node::from(exec.text.as_str()));
            } else if strict {
                return Err(ResolveError::invalid_attribute(
                    phase.name.as_str(),
                    exec.name.as_str(),
                    "expected exec",
                ));
            } else {
                warn!(phase = %phase.name, element = %exec.name, "ignoring unknown command element");
            }
        }
    }
    Ok(out)
}

/// Normalize a (filtered, key-normalized) generic-tree command manifest.
///
/// Dependency lists and step phases given as a scalar become one-element
/// lists, and a step missing a phase gets an empty one.
#[must_use]
pub fn normalize(mapping: Mapping) -> Mapping {
    mapping
        .into_iter()
        .filter_map(|(key, value)| {
            let value = if DEPEND_LISTS.contains(&key.as_str()) {
                normalize_list(value)?
            } else if key == STEPS {
                match normalize_list(value)? {
                    Node::List(items) => Node::List(items.into_iter().map(normalize_step).collect()),
                    other => other,
                }
            } else {
                value
            };
            Some((key, value))
        })
        .collect()
}

fn normalize_step(item: Node) -> Node {
    let Node::Map(mut wrapper) = item else {
        return item;
    };
    match wrapper.get_mut(STEP) {
        Some(Node::Map(step)) => {
            let phases = std::mem::take(step);
            let mut out = empty_step();
            for (phase, value) in phases {
                let value = if PHASES.contains(&phase.as_str()) {
                    normalize_list(value).unwrap_or_else(|| Node::List(Vec::new()))
                } else {
                    value
                };
                out.insert(phase, value);
            }
            *step = out;
        }
        Some(slot) if *slot == Node::Null => *slot = Node::Map(empty_step()),
        _ => {}
    }
    Node::Map(wrapper)
}

/// Check a canonical command manifest against the command layout.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidAttribute`] for an unknown key at any level
/// or a list holding anything but leaf values.
pub fn validate(mapping: &Mapping) -> Result<()> {
    for (key, value) in mapping {
        if DEPEND_LISTS.contains(&key.as_str()) {
            if !is_leaf_list(value) {
                return Err(ResolveError::invalid_attribute(
                    ROOT,
                    key.as_str(),
                    "expected a list of values",
                ));
            }
        } else if key == STEPS {
            let Some(items) = value.as_list() else {
                return Err(ResolveError::invalid_attribute(ROOT, STEPS, "expected a list of steps"));
            };
            items.iter().try_for_each(validate_step)?;
        } else {
            return Err(ResolveError::invalid_attribute(ROOT, key.as_str(), "unknown section"));
        }
    }
    Ok(())
}

fn validate_step(item: &Node) -> Result<()> {
    let Some(wrapper) = item.as_map() else {
        return Err(ResolveError::invalid_attribute(STEPS, STEP, "a step must be a mapping"));
    };
    for (key, value) in wrapper {
        if key != STEP {
            return Err(ResolveError::invalid_attribute(STEPS, key.as_str(), "expected step"));
        }
        let Some(phases) = value.as_map() else {
            return Err(ResolveError::invalid_attribute(STEPS, STEP, "a step must be a mapping"));
        };
        for (phase, execs) in phases {
            if !PHASES.contains(&phase.as_str()) {
                return Err(ResolveError::invalid_attribute(
                    STEP,
                    phase.as_str(),
                    "expected guard or command",
                ));
            }
            if !is_leaf_list(execs) {
                return Err(ResolveError::invalid_attribute(
                    STEP,
                    phase.as_str(),
                    "expected a list of commands",
                ));
            }
        }
    }
    Ok(())
}

/// Render a canonical command manifest as an element tree. Empty phases are
/// omitted.
#[must_use]
pub fn to_element(mapping: &Mapping, commandname: &str) -> Element {
    let mut root = Element::new(ROOT).with_attribute(COMMANDNAME_ATTRIBUTE, commandname);
    for key in DEPEND_LISTS {
        if let Some(value) = mapping.get(key) {
            for text in leaves(value) {
                root.children.push(Element::leaf(key, text));
            }
        }
    }
    let steps = mapping.get(STEPS).and_then(Node::as_list).unwrap_or_default();
    for item in steps {
        let Some(step) = item.as_map().and_then(|w| w.get(STEP)).and_then(Node::as_map) else {
            continue;
        };
        let mut element = Element::new(STEP);
        for phase in PHASES {
            let execs = step.get(phase).map(leaves).unwrap_or_default();
            if execs.is_empty() {
                continue;
            }
            let mut phase_element = Element::new(phase);
            phase_element.children = execs.into_iter().map(|e| Element::leaf(EXEC, e)).collect();
            element.children.push(phase_element);
        }
        root.children.push(element);
    }
    for (key, value) in mapping {
        if key != STEPS && !DEPEND_LISTS.contains(&key.as_str()) {
            root.children.extend(encode_generic(key, value));
        }
    }
    root
}
