//! Manifest resolution engine.
//!
//! Takes per-node configuration manifests written in either of two
//! interchangeable surface syntaxes (a generic map/list tree with `where`
//! branches, or an element tree with guard attributes), evaluates every
//! conditional branch against a node's facts and group memberships, and
//! produces one canonical mapping regardless of the syntax it came from.
//!
//! The public API is organised in layers, leaves first:
//!
//! - **[`context`]**, **[`node`]**, **[`element`]**: the data the engine works on
//! - **[`predicate`]**: condition expressions and single-attribute guards
//! - **[`filter`]**: conditional-branch, guard-attribute and allow-list filters
//! - **[`canonical`]**: conversion to and from the canonical mapping
//! - **[`loader`]**, **[`defaults`]**: reading documents from a repository
//! - **[`resolver`]**: the end-to-end pipeline, single and batched
//! - **[`consistency`]**: detecting disagreement across repeated resolutions
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod canonical;
pub mod config;
pub mod consistency;
pub mod context;
pub mod defaults;
pub mod element;
pub mod error;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod node;
pub mod predicate;
pub mod resolver;

pub use context::Context;
pub use defaults::Defaults;
pub use error::{ResolveError, Result};
pub use node::{Mapping, Node};
pub use resolver::{ResolveOptions, Resolver, resolve_command_manifest, resolve_resource_manifest};
