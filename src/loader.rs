//! Locating and reading raw manifest documents.
//!
//! Each target directory holds its manifest under one basename in exactly
//! one surface syntax: `<basename>.yml` (generic tree) or `<basename>.xml`
//! (element tree).
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::element::Element;
use crate::error::{ResolveError, Result};
use crate::node::{Mapping, Node};

/// Surface syntax of a manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSyntax {
    /// Nested maps and lists with `where` branches (`.yml`).
    GenericTree,
    /// Elements with guard attributes (`.xml`).
    ElementTree,
}

impl ManifestSyntax {
    /// Both syntaxes, in lookup order.
    pub const ALL: [Self; 2] = [Self::GenericTree, Self::ElementTree];

    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::GenericTree => "yml",
            Self::ElementTree => "xml",
        }
    }

    /// File name for `basename` in this syntax.
    #[must_use]
    pub fn file_name(self, basename: &str) -> String {
        format!("{basename}.{}", self.extension())
    }
}

impl fmt::Display for ManifestSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenericTree => write!(f, "generic-tree"),
            Self::ElementTree => write!(f, "element-tree"),
        }
    }
}

/// Which kind of document is being read; passed to the schema validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A resource manifest (`config.*`).
    Resource,
    /// A command manifest (`commands.*`).
    Command,
    /// Repository-wide resource defaults (`defaults.*`).
    Defaults,
}

/// External validator for element-tree documents, run before filtering.
pub trait SchemaValidator: Send + Sync {
    /// Accept or reject `root`. The error string is reported verbatim.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the document is invalid.
    fn validate(&self, kind: DocumentKind, root: &Element) -> std::result::Result<(), String>;
}

/// Validator that accepts every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SchemaValidator for AcceptAll {
    fn validate(&self, _kind: DocumentKind, _root: &Element) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// A parsed manifest document, still unfiltered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// Generic-tree root mapping with keys normalized.
    GenericTree(Mapping),
    /// Element-tree root element.
    ElementTree(Element),
}

/// Manifest text read from disk (or supplied directly), not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawManifest {
    /// Surface syntax of `text`.
    pub syntax: ManifestSyntax,
    /// Where the text came from, for error messages.
    pub origin: String,
    /// Full document text.
    pub text: String,
}

impl RawManifest {
    /// Wrap document text.
    #[must_use]
    pub fn new(syntax: ManifestSyntax, origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            syntax,
            origin: origin.into(),
            text: text.into(),
        }
    }

    /// Parse the text. Returns `None` for a document with no top-level
    /// content (empty, whitespace, a bare YAML null, or no root element).
    ///
    /// Element-tree documents are passed through `validator` first.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Parse`] for malformed text or a generic-tree
    /// root that is not a mapping, and [`ResolveError::Schema`] when the
    /// validator rejects the document.
    pub fn parse(
        &self,
        kind: DocumentKind,
        validator: &dyn SchemaValidator,
    ) -> Result<Option<Document>> {
        match self.syntax {
            ManifestSyntax::GenericTree => match Node::from_yaml_str(&self.text, &self.origin)? {
                Node::Null => Ok(None),
                Node::Map(map) => Ok(Some(Document::GenericTree(
                    crate::node::normalize_mapping_keys(map),
                ))),
                _ => Err(ResolveError::Parse {
                    syntax: "yaml",
                    origin: self.origin.clone(),
                    message: "document root must be a mapping".to_string(),
                }),
            },
            ManifestSyntax::ElementTree => {
                let Some(root) = Element::parse(&self.text, &self.origin)? else {
                    return Ok(None);
                };
                validator
                    .validate(kind, &root)
                    .map_err(|message| ResolveError::Schema {
                        origin: self.origin.clone(),
                        message,
                    })?;
                Ok(Some(Document::ElementTree(root)))
            }
        }
    }
}

/// Find the manifest file for `basename` in `dir`.
///
/// Returns `None` when neither candidate exists.
///
/// # Errors
///
/// Returns [`ResolveError::AmbiguousManifest`] when both exist.
pub fn locate(dir: &Path, basename: &str) -> Result<Option<(ManifestSyntax, PathBuf)>> {
    let mut found = ManifestSyntax::ALL
        .into_iter()
        .map(|syntax| (syntax, dir.join(syntax.file_name(basename))))
        .filter(|(_, path)| path.is_file());
    let first = found.next();
    if let (Some((_, first)), Some((_, second))) = (&first, found.next()) {
        return Err(ResolveError::AmbiguousManifest {
            target: dir.display().to_string(),
            first: first.display().to_string(),
            second: second.display().to_string(),
        });
    }
    Ok(first)
}

/// Read the manifest for `basename` in `dir`.
///
/// The file is read to completion and closed before anything is parsed.
///
/// # Errors
///
/// Returns [`ResolveError::MissingManifest`] when neither candidate exists,
/// [`ResolveError::AmbiguousManifest`] when both do, and
/// [`ResolveError::Io`] when the file cannot be read.
pub fn load_raw(dir: &Path, basename: &str) -> Result<RawManifest> {
    let Some((syntax, path)) = locate(dir, basename)? else {
        return Err(missing(dir, basename));
    };
    read(syntax, &path)
}

/// Like [`load_raw`], but a missing manifest is `Ok(None)`.
///
/// # Errors
///
/// As [`load_raw`], except for [`ResolveError::MissingManifest`].
pub fn load_optional(dir: &Path, basename: &str) -> Result<Option<RawManifest>> {
    locate(dir, basename)?
        .map(|(syntax, path)| read(syntax, &path))
        .transpose()
}

fn read(syntax: ManifestSyntax, path: &Path) -> Result<RawManifest> {
    let text = std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), %syntax, bytes = text.len(), "read manifest");
    Ok(RawManifest::new(syntax, path.display().to_string(), text))
}

/// [`ResolveError::MissingManifest`] for `basename` in `dir`.
pub(crate) fn missing(dir: &Path, basename: &str) -> ResolveError {
    ResolveError::MissingManifest {
        target: dir.display().to_string(),
        candidates: ManifestSyntax::ALL
            .map(|syntax| syntax.file_name(basename))
            .join(", "),
    }
}
