//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary project directory holding a `BSFile`.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create from a fixture file, copied to `BSFile`.
  pub fn from_fixture(name: &str) -> Self {
    let env = Self::empty();
    env.write_file("BSFile", &fixture_content(name));
    env
  }

  /// Create with the given `BSFile` content.
  pub fn with_build_file(content: &str) -> Self {
    let env = Self::empty();
    env.write_file("BSFile", content);
    env
  }

  /// Create an empty test environment.
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// A `bs` command running in `relative_dir` of the project.
  ///
  /// Compiler and platform overrides from the calling environment are
  /// removed so the printed commands are predictable.
  pub fn bs_cmd_in(&self, relative_dir: &str) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("bs");
    cmd.current_dir(self.temp.path().join(relative_dir));
    for var in [
      "CC",
      "CXX",
      "AR",
      "CFLAGS",
      "CXXFLAGS",
      "RUST_LOG",
      "BS_PLATFORM",
      "BS_PLATFORM_FLAVOR",
      "BS_PLATFORM_VERSION",
      "BS_PLATFORM_ARCH",
      "BS_RUN_PREFIX",
      "BS_RUN_SUFFIX",
    ] {
      cmd.env_remove(var);
    }
    cmd
  }

  /// A `bs` command running at the project root.
  pub fn bs_cmd(&self) -> Command {
    self.bs_cmd_in(".")
  }
}
