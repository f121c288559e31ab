//! Error taxonomy shared by every layer of the build engine.
//!
//! Each class maps to a distinct process exit status so scripts driving `bs`
//! can tell a broken description file from a compiler failure.

use std::io;
use std::path::PathBuf;

use mlua::prelude::LuaError;
use thiserror::Error;

use crate::deps::cache::CacheError;
use crate::template::TemplateError;

/// Process exit statuses, one per error class.
pub mod exit_code {
  pub const CONFIG: i32 = 1;
  pub const DEPENDENCY_SCAN: i32 = 2;
  pub const CREATE_DIR: i32 = 3;
  pub const MISSING_INPUT: i32 = 4;
  pub const FILESYSTEM: i32 = 5;
  pub const TARGET_FAILED: i32 = 6;
  pub const INTERRUPTED: i32 = 255;
}

#[derive(Debug, Error)]
pub enum BuildError {
  /// Invalid description file content, unsupported platform or bad option.
  #[error("{0}")]
  Config(String),

  #[error("template error: {0}")]
  Template(#[from] TemplateError),

  #[error("missing input '{input}' (searched: {searched})")]
  MissingInput { input: String, searched: String },

  #[error("dependency scan of '{input}' failed: {reason}")]
  DependencyScan { input: String, reason: String },

  #[error("cannot create directory '{}': {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("directory '{}' is not empty", .0.display())]
  DirectoryNotEmpty(PathBuf),

  #[error("filesystem error on '{}': {source}", path.display())]
  Filesystem {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("cannot launch '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("dependency cache error: {0}")]
  Cache(#[from] CacheError),

  #[error("target '{0}' failed to build")]
  TargetFailed(String),

  #[error("User cancelled the execution")]
  Interrupted,

  #[error("lua error: {0}")]
  Lua(#[from] LuaError),
}

impl BuildError {
  pub fn config(message: impl Into<String>) -> Self {
    Self::Config(message.into())
  }

  pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
    Self::Filesystem {
      path: path.into(),
      source,
    }
  }

  /// Exit status for this error.
  ///
  /// Errors that crossed a Lua callback boundary keep the status of the
  /// original engine error.
  pub fn exit_code(&self) -> i32 {
    match self {
      Self::Config(_) | Self::Template(_) => exit_code::CONFIG,
      Self::DependencyScan { .. } => exit_code::DEPENDENCY_SCAN,
      Self::CreateDir { .. } => exit_code::CREATE_DIR,
      Self::MissingInput { .. } => exit_code::MISSING_INPUT,
      Self::DirectoryNotEmpty(_) | Self::Filesystem { .. } | Self::Spawn { .. } | Self::Cache(_) => {
        exit_code::FILESYSTEM
      }
      Self::TargetFailed(_) => exit_code::TARGET_FAILED,
      Self::Interrupted => exit_code::INTERRUPTED,
      Self::Lua(err) => find_build_error(err).map_or(exit_code::CONFIG, BuildError::exit_code),
    }
  }

  pub fn is_interrupted(&self) -> bool {
    self.exit_code() == exit_code::INTERRUPTED
  }
}

/// Walk a Lua error chain looking for an engine error raised from a callback.
pub fn find_build_error(err: &LuaError) -> Option<&BuildError> {
  match err {
    LuaError::ExternalError(inner) => inner.downcast_ref::<BuildError>(),
    LuaError::CallbackError { cause, .. } => find_build_error(cause),
    LuaError::WithContext { cause, .. } => find_build_error(cause),
    _ => None,
  }
}

impl From<BuildError> for LuaError {
  fn from(err: BuildError) -> Self {
    match err {
      BuildError::Lua(inner) => inner,
      other => LuaError::external(other),
    }
  }
}
