//! Domain-specific error types for the manifest resolution engine.
//!
//! Every resolution step returns [`ResolveError`]. The engine never recovers
//! from an error internally: a defect in one manifest aborts resolution for
//! that target, and the caller decides whether to keep its last-known-good
//! state. Callers at an application boundary can convert into
//! [`anyhow::Error`] with the standard `?` operator.
//!
//! # Error kinds
//!
//! ```text
//! ResolveError
//! ├── MissingManifest      neither surface syntax present (or blank)
//! ├── AmbiguousManifest    both surface syntaxes present
//! ├── MalformedPredicate   condition expression could not be parsed
//! ├── InvalidAttribute     attribute not legal where it appears
//! ├── Parse                document text is not valid YAML / XML
//! ├── Schema               external schema validator rejected the document
//! ├── Encode               element tree could not be written as XML
//! └── Io                   manifest file could not be read
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

/// Top-level error type for manifest resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No manifest exists for the target in either surface syntax.
    #[error("No manifest for '{target}': expected one of {candidates}")]
    MissingManifest {
        /// Target (file path or command name) being resolved.
        target: String,
        /// Candidate file names that were checked.
        candidates: String,
    },

    /// Both surface syntaxes exist for the same target.
    #[error("Ambiguous manifest for '{target}': both {first} and {second} exist")]
    AmbiguousManifest {
        /// Target being resolved.
        target: String,
        /// First candidate found.
        first: String,
        /// Second candidate found.
        second: String,
    },

    /// A condition expression could not be parsed or compiled.
    #[error("Malformed predicate '{expression}': {reason}")]
    MalformedPredicate {
        /// The offending expression text.
        expression: String,
        /// Human-readable reason.
        reason: String,
    },

    /// An attribute key or value is not legal in the section where it appears.
    #[error("Invalid attribute '{key}' in {section}: {reason}")]
    InvalidAttribute {
        /// Section or resource kind containing the attribute.
        section: String,
        /// The offending key.
        key: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Document text is not valid in its surface syntax.
    #[error("Failed to parse {syntax} document {origin}: {message}")]
    Parse {
        /// Surface syntax name (`yaml` or `xml`).
        syntax: &'static str,
        /// Where the document came from.
        origin: String,
        /// Parser message.
        message: String,
    },

    /// The external schema validator rejected an element-tree document.
    #[error("Schema validation failed for {origin}: {message}")]
    Schema {
        /// Where the document came from.
        origin: String,
        /// Validator message.
        message: String,
    },

    /// An element tree could not be written out as XML.
    #[error("Failed to encode element <{element}>: {message}")]
    Encode {
        /// Name of the element being written.
        element: String,
        /// Writer message.
        message: String,
    },

    /// A manifest file could not be read.
    #[error("IO error reading manifest {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl ResolveError {
    /// Build a [`ResolveError::MalformedPredicate`].
    pub(crate) fn malformed(expression: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPredicate {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a [`ResolveError::InvalidAttribute`].
    pub(crate) fn invalid_attribute(
        section: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            section: section.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}
