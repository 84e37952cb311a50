//! TOML configuration file parsing.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load a TOML file into `T`.
///
/// A missing file deserializes from empty TOML, so every field falls back to
/// its `#[serde(default)]`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read engine config: {}", path.display()));
        }
    };
    toml::from_str(&content)
        .with_context(|| format!("Invalid engine config: {}", path.display()))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Sample {
        #[serde(default)]
        names: Vec<String>,
    }

    #[test]
    fn missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let sample: Sample = load_config(&dir.path().join("absent.toml")).unwrap();
        assert!(sample.names.is_empty());
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "names = [").unwrap();
        let err = load_config::<Sample>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }
}
