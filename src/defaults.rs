//! Repository-wide default attributes per resource kind.
use std::path::Path;

use tracing::debug;

use crate::canonical::{resource, schema};
use crate::error::Result;
use crate::loader::{self, AcceptAll, Document, DocumentKind, RawManifest, SchemaValidator};
use crate::node::{Mapping, Node};

/// Default attributes, keyed by resource kind.
///
/// `file`, `link` and `directory` are always present (possibly empty).
/// Immutable once loaded and safe to share across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    kinds: Mapping,
}

impl Default for Defaults {
    fn default() -> Self {
        Self::from_mapping(Mapping::new())
    }
}

impl Defaults {
    /// Build defaults from a canonical mapping of kind to attributes.
    ///
    /// Entries that are not resource-kind mappings are ignored.
    #[must_use]
    pub fn from_mapping(mapping: Mapping) -> Self {
        let mut kinds: Mapping = schema::DEFAULTED_KINDS
            .iter()
            .map(|kind| ((*kind).to_string(), Node::Map(Mapping::new())))
            .collect();
        for (key, value) in mapping {
            if schema::kind(&key).is_none() {
                continue;
            }
            if let Node::Map(attrs) = value {
                kinds.insert(key, Node::Map(attrs));
            }
        }
        Self { kinds }
    }

    /// Load `<basename>.yml` or `<basename>.xml` from `dir`.
    ///
    /// Neither file, or a blank document, yields empty defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ResolveError::AmbiguousManifest`] when both files
    /// exist, and parse, schema or I/O errors from reading the one present.
    pub fn load(dir: &Path, basename: &str) -> Result<Self> {
        Self::load_with(dir, basename, &AcceptAll)
    }

    /// [`Defaults::load`] with an explicit element-tree validator.
    ///
    /// # Errors
    ///
    /// As [`Defaults::load`].
    pub fn load_with(dir: &Path, basename: &str, validator: &dyn SchemaValidator) -> Result<Self> {
        match loader::load_optional(dir, basename)? {
            Some(raw) => Self::from_raw(&raw, validator),
            None => {
                debug!(dir = %dir.display(), "no defaults file, using empty defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse defaults from document text.
    ///
    /// # Errors
    ///
    /// Returns parse or schema errors for the document.
    pub fn from_raw(raw: &RawManifest, validator: &dyn SchemaValidator) -> Result<Self> {
        let mapping = match raw.parse(DocumentKind::Defaults, validator)? {
            None => Mapping::new(),
            Some(Document::GenericTree(map)) => resource::normalize(map),
            Some(Document::ElementTree(root)) => resource::from_element(&root, false)?,
        };
        Ok(Self::from_mapping(mapping))
    }

    /// Default attributes for `kind`.
    #[must_use]
    pub fn for_kind(&self, kind: &str) -> Option<&Mapping> {
        self.kinds.get(kind).and_then(Node::as_map)
    }

    /// The full kind-to-attributes mapping.
    #[must_use]
    pub const fn as_mapping(&self) -> &Mapping {
        &self.kinds
    }

    /// Merge defaults beneath the attributes of every resource kind
    /// `manifest` declares. Manifest values win; kinds the manifest does not
    /// declare are left out.
    pub fn apply(&self, manifest: &mut Mapping) {
        for (kind, value) in manifest.iter_mut() {
            let (Some(defaults), Node::Map(attrs)) = (self.for_kind(kind), &mut *value) else {
                continue;
            };
            if defaults.is_empty() {
                continue;
            }
            let mut merged = defaults.clone();
            merged.extend(std::mem::take(attrs));
            *attrs = merged;
        }
    }
}
