//! End-to-end manifest resolution.
//!
//! ```text
//! RawManifest ──parse──► Document ──filter(Context)──► tree ──canonicalize──► Mapping
//!                                                         │
//!                              strict check ◄─────────────┘
//!                              defaults merge, key filter ──► resolved Mapping
//! ```
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::canonical::{command, resource, schema};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::defaults::Defaults;
use crate::error::{ResolveError, Result};
use crate::filter::{self, filter_elements, filter_mapping};
use crate::loader::{self, AcceptAll, Document, DocumentKind, RawManifest, SchemaValidator};
use crate::node::{Mapping, Node};

/// Per-resolution settings.
#[derive(Clone)]
pub struct ResolveOptions {
    /// Reject attributes that are not legal where they appear.
    pub strict: bool,
    /// When set, keep only `depend`, `post` and these keys of a resolved
    /// resource manifest.
    pub key_filter: Option<Vec<String>>,
    /// Validator run on element-tree documents before filtering.
    pub validator: Arc<dyn SchemaValidator>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            strict: false,
            key_filter: None,
            validator: Arc::new(AcceptAll),
        }
    }
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("strict", &self.strict)
            .field("key_filter", &self.key_filter)
            .finish_non_exhaustive()
    }
}

impl ResolveOptions {
    /// Options taken from an engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            strict: config.strict,
            key_filter: config.key_filter.clone(),
            ..Self::default()
        }
    }

    /// Builder: enable or disable strict mode.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Builder: use `validator` for element-tree documents.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }
}

fn parse_present(raw: &RawManifest, kind: DocumentKind, options: &ResolveOptions) -> Result<Document> {
    raw.parse(kind, options.validator.as_ref())?
        .ok_or_else(|| ResolveError::MissingManifest {
            target: raw.origin.clone(),
            candidates: format!("a non-empty {} document", raw.syntax),
        })
}

fn check_strict(
    raw: &RawManifest,
    mapping: &Mapping,
    validate: fn(&Mapping) -> Result<()>,
) -> Result<()> {
    validate(mapping).inspect_err(|e| warn!(origin = %raw.origin, "strict check failed: {e}"))
}

/// Resolve one resource manifest for one node.
///
/// The result always carries `file`, `link` and `directory`, empty when the
/// manifest does not declare them.
///
/// # Errors
///
/// Returns [`ResolveError::MissingManifest`] for a blank document, and any
/// parse, schema, predicate or (in strict mode) attribute error raised along
/// the way.
pub fn resolve_resource_manifest(
    raw: &RawManifest,
    defaults: &Defaults,
    context: &Context,
    options: &ResolveOptions,
) -> Result<Mapping> {
    let mut mapping = match parse_present(raw, DocumentKind::Resource, options)? {
        Document::ElementTree(mut root) => {
            let removed = filter_elements(&mut root, context)?;
            debug!(origin = %raw.origin, removed, "filtered element tree");
            resource::from_element(&root, options.strict)?
        }
        Document::GenericTree(tree) => resource::normalize(filter_mapping(&tree, context)?),
    };
    if options.strict {
        check_strict(raw, &mapping, resource::validate)?;
    }
    defaults.apply(&mut mapping);
    for kind in schema::DEFAULTED_KINDS {
        mapping
            .entry(kind.to_string())
            .or_insert_with(|| Node::Map(Mapping::new()));
    }
    if let Some(keep) = &options.key_filter {
        let keep: Vec<&str> = keep.iter().map(String::as_str).collect();
        filter::filter(&mut mapping, &keep);
    }
    debug!(origin = %raw.origin, sections = mapping.len(), "resolved resource manifest");
    Ok(mapping)
}

/// Resolve one command manifest for one node.
///
/// # Errors
///
/// As [`resolve_resource_manifest`].
pub fn resolve_command_manifest(
    raw: &RawManifest,
    context: &Context,
    options: &ResolveOptions,
) -> Result<Mapping> {
    let mapping = match parse_present(raw, DocumentKind::Command, options)? {
        Document::ElementTree(mut root) => {
            let removed = filter_elements(&mut root, context)?;
            debug!(origin = %raw.origin, removed, "filtered element tree");
            command::from_element(&root, options.strict)?
        }
        Document::GenericTree(tree) => command::normalize(filter_mapping(&tree, context)?),
    };
    if options.strict {
        check_strict(raw, &mapping, command::validate)?;
    }
    debug!(origin = %raw.origin, sections = mapping.len(), "resolved command manifest");
    Ok(mapping)
}

/// Resolves manifests out of a repository directory.
///
/// ```text
/// <root>/defaults.{yml,xml}
/// <root>/source/<target>/config.{yml,xml}
/// <root>/commands/<name>/commands.{yml,xml}
/// ```
///
/// Defaults are loaded once at construction; the resolver is immutable
/// afterwards and can be shared across threads.
#[derive(Debug)]
pub struct Resolver {
    root: PathBuf,
    config: EngineConfig,
    options: ResolveOptions,
    defaults: Defaults,
}

impl Resolver {
    /// Open the repository at `root` with the default validator.
    ///
    /// # Errors
    ///
    /// Returns an error if the defaults file is ambiguous or malformed.
    pub fn open(root: impl Into<PathBuf>, config: EngineConfig) -> Result<Self> {
        Self::with_validator(root, config, Arc::new(AcceptAll))
    }

    /// Open the repository at `root`, validating element-tree documents
    /// with `validator`.
    ///
    /// # Errors
    ///
    /// As [`Resolver::open`].
    pub fn with_validator(
        root: impl Into<PathBuf>,
        config: EngineConfig,
        validator: Arc<dyn SchemaValidator>,
    ) -> Result<Self> {
        let root = root.into();
        let defaults =
            Defaults::load_with(&root, &config.layout.defaults_basename, validator.as_ref())?;
        let options = ResolveOptions::from_config(&config).with_validator(validator);
        debug!(root = %root.display(), strict = options.strict, "opened manifest repository");
        Ok(Self {
            root,
            config,
            options,
            defaults,
        })
    }

    /// Repository root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded defaults.
    #[must_use]
    pub const fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Directory holding the resource manifest for `target`.
    ///
    /// Absolute targets (`/etc/motd`) are looked up relative to the sources
    /// directory.
    #[must_use]
    pub fn resource_dir(&self, target: &str) -> PathBuf {
        self.root
            .join(&self.config.layout.sources)
            .join(target.trim_start_matches('/'))
    }

    /// Directory holding the command manifest `name`.
    #[must_use]
    pub fn command_dir(&self, name: &str) -> PathBuf {
        self.root.join(&self.config.layout.commands).join(name)
    }

    /// Resolve the resource manifest for `target`.
    ///
    /// # Errors
    ///
    /// As [`loader::load_raw`] and [`resolve_resource_manifest`].
    pub fn resolve_resource(&self, target: &str, context: &Context) -> Result<Mapping> {
        let raw = loader::load_raw(
            &self.resource_dir(target),
            &self.config.layout.resource_basename,
        )?;
        resolve_resource_manifest(&raw, &self.defaults, context, &self.options)
    }

    /// Resolve the command manifest `name`.
    ///
    /// # Errors
    ///
    /// As [`loader::load_raw`] and [`resolve_command_manifest`].
    pub fn resolve_command(&self, name: &str, context: &Context) -> Result<Mapping> {
        let raw = loader::load_raw(
            &self.command_dir(name),
            &self.config.layout.command_basename,
        )?;
        resolve_command_manifest(&raw, context, &self.options)
    }

    /// Resolve many resource targets for one node.
    ///
    /// Results are in input order and independent: one failing target does
    /// not affect the others. Runs on the rayon pool unless the engine
    /// configuration disables parallelism.
    #[must_use]
    pub fn resolve_many<S: AsRef<str> + Sync>(
        &self,
        targets: &[S],
        context: &Context,
    ) -> Vec<Result<Mapping>> {
        let resolve = |target: &S| self.resolve_resource(target.as_ref(), context);
        if self.config.parallel {
            targets.par_iter().map(resolve).collect()
        } else {
            targets.iter().map(resolve).collect()
        }
    }

    /// Resolve one resource target for many nodes, in input order.
    #[must_use]
    pub fn resolve_for_nodes(&self, target: &str, contexts: &[Context]) -> Vec<Result<Mapping>> {
        let resolve = |context: &Context| self.resolve_resource(target, context);
        if self.config.parallel {
            contexts.par_iter().map(resolve).collect()
        } else {
            contexts.iter().map(resolve).collect()
        }
    }
}
