// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed manifest repository and a fluent
// builder so each integration test can lay out the files it needs without
// repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use manifest_resolver::config::EngineConfig;
use manifest_resolver::{Context, Resolver};

/// Create the empty `source/` and `commands/` directories of a repository.
pub fn setup_minimal_repo(root: &Path) {
    std::fs::create_dir_all(root.join("source")).expect("create source dir");
    std::fs::create_dir_all(root.join("commands")).expect("create commands dir");
}

/// The node context most tests resolve against: RedHat 6.5 in groups
/// `one` and `two`.
pub fn redhat_node() -> Context {
    Context::default()
        .with_fact("operatingsystem", "RedHat")
        .with_fact("operatingsystemrelease", "6.5")
        .with_group("one")
        .with_group("two")
}

/// A SunOS node in group `three`.
pub fn sunos_node() -> Context {
    Context::default()
        .with_fact("operatingsystem", "SunOS")
        .with_fact("operatingsystemrelease", "5.10")
        .with_group("three")
}

/// An isolated manifest repository backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct TestRepo {
    /// Temporary directory containing the repository.
    pub root: tempfile::TempDir,
}

impl TestRepo {
    /// Create a new repository with no manifests.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        setup_minimal_repo(root.path());
        Self { root }
    }

    /// Path to the repository root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Open a resolver over this repository.
    pub fn resolver(&self, config: EngineConfig) -> Resolver {
        Resolver::open(self.root.path(), config).expect("open resolver")
    }
}

/// Fluent builder for [`TestRepo`].
pub struct TestRepoBuilder {
    repo: TestRepo,
}

impl TestRepoBuilder {
    /// Begin building an empty repository.
    pub fn new() -> Self {
        Self {
            repo: TestRepo::new(),
        }
    }

    fn write(self, path: PathBuf, content: &str) -> Self {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write manifest");
        self
    }

    /// Write `source/<target>/<file>` (e.g. `config.xml`).
    pub fn with_resource(self, target: &str, file: &str, content: &str) -> Self {
        let path = self
            .repo
            .root
            .path()
            .join("source")
            .join(target.trim_start_matches('/'))
            .join(file);
        self.write(path, content)
    }

    /// Write `commands/<name>/<file>` (e.g. `commands.yml`).
    pub fn with_command(self, name: &str, file: &str, content: &str) -> Self {
        let path = self.repo.root.path().join("commands").join(name).join(file);
        self.write(path, content)
    }

    /// Write `<file>` (e.g. `defaults.yml`) at the repository root.
    pub fn with_root_file(self, file: &str, content: &str) -> Self {
        let path = self.repo.root.path().join(file);
        self.write(path, content)
    }

    /// Finish building and return the repository.
    pub fn build(self) -> TestRepo {
        self.repo
    }
}
