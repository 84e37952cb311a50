//! Engine configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! or missing file yields [`EngineConfig::default`].
//!
//! ```toml
//! strict = true
//! parallel = true
//! key_filter = ["file", "link"]
//!
//! [layout]
//! sources = "source"
//! commands = "commands"
//! resource_basename = "config"
//! command_basename = "commands"
//! defaults_basename = "defaults"
//! ```
pub mod toml_loader;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Repository layout: where manifests live and what they are called.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    /// Directory (under the repository root) holding one directory per file target.
    pub sources: String,
    /// Directory holding one directory per command.
    pub commands: String,
    /// Basename of resource manifests.
    pub resource_basename: String,
    /// Basename of command manifests.
    pub command_basename: String,
    /// Basename of the defaults file at the repository root.
    pub defaults_basename: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            sources: "source".to_string(),
            commands: "commands".to_string(),
            resource_basename: "config".to_string(),
            command_basename: "commands".to_string(),
            defaults_basename: "defaults".to_string(),
        }
    }
}

/// Settings for a [`crate::Resolver`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Reject attributes that are not legal where they appear.
    pub strict: bool,
    /// Resolve batches on the rayon thread pool.
    pub parallel: bool,
    /// When set, resolved resource manifests keep only `depend`, `post` and
    /// these keys.
    pub key_filter: Option<Vec<String>>,
    /// Repository layout.
    pub layout: Layout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict: false,
            parallel: true,
            key_filter: None,
            layout: Layout::default(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        toml_loader::load_config(path)
            .with_context(|| format!("loading engine config {}", path.display()))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("engine.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.parallel);
        assert!(!config.strict);
    }

    #[test]
    fn partial_file_overrides_selected_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            "strict = true\nkey_filter = [\"file\"]\n[layout]\nsources = \"files\"\n",
        )
        .unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert!(config.strict);
        assert!(config.parallel);
        assert_eq!(config.key_filter, Some(vec!["file".to_string()]));
        assert_eq!(config.layout.sources, "files");
        assert_eq!(config.layout.resource_basename, "config");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "stritc = true\n").unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("engine.toml"));
    }
}
