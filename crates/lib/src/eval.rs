//! Description file evaluation.
//!
//! This module provides the `evaluate` function which loads the project files
//! found above the start directory, then the build file of the start
//! directory, and finally runs the requested actions.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::compiler::{BuildStats, Toolchain};
use crate::dispatch;
use crate::error::BuildError;
use crate::exec::TaskRunner;
use crate::lua::{loaders, runtime};
use crate::platform::PlatformInfo;
use crate::session::{Session, SessionOptions, SessionRef};
use crate::variant::Variant;

/// Outcome of a whole invocation.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
  /// Every action succeeded and no target reported a toolchain failure.
  pub success: bool,
  pub stats: BuildStats,
  /// Targets (or actions) that failed, in the order they failed.
  pub failed: Vec<String>,
  /// Description files loaded, by real path.
  pub loaded_files: Vec<PathBuf>,
  /// Dependency cache files written at the end of the run.
  pub caches_saved: usize,
}

/// Every file named `name` in `start` or one of its ancestors, most generic first.
pub fn find_project_files(start: &Path, name: &str) -> Vec<PathBuf> {
  let mut found: Vec<PathBuf> = start
    .ancestors()
    .map(|dir| dir.join(name))
    .filter(|path| path.is_file())
    .collect();
  found.reverse();
  found
}

/// Evaluate the description files of `start_dir` and run the requested actions.
///
/// This function:
/// 1. Detects the platform and creates the Lua runtime with the `bs` global
/// 2. Loads every project file from the filesystem root down to `start_dir`
/// 3. Replaces the default variant with the command-line variants, if any
/// 4. Loads the build file of `start_dir`
/// 5. Runs the requested actions (or the `default` function)
/// 6. Saves the dependency caches, even when an action failed
///
/// # Errors
///
/// Returns a configuration error when the build file does not exist, and any
/// engine or Lua error raised while loading or running actions.
pub fn evaluate(start_dir: &Path, options: SessionOptions, runner: Box<dyn TaskRunner>) -> Result<RunSummary, BuildError> {
  let platform = PlatformInfo::detect()?;
  evaluate_with_toolchain(start_dir, options, Toolchain::from_env(platform), runner)
}

/// [`evaluate`] with an explicit toolchain.
pub fn evaluate_with_toolchain(
  start_dir: &Path,
  options: SessionOptions,
  toolchain: Toolchain,
  runner: Box<dyn TaskRunner>,
) -> Result<RunSummary, BuildError> {
  let start_dir = dunce::canonicalize(start_dir).map_err(|e| BuildError::filesystem(start_dir, e))?;
  let session = Session::with_toolchain(start_dir, options, toolchain, runner).into_shared();

  let result = run(&session);

  let saved = session.borrow_mut().compiler.save_cache();
  let success = result?;
  let caches_saved = saved?;

  let session = session.borrow();
  let mut failed = session.compiler.failed_targets().to_vec();
  if !success && failed.is_empty() {
    failed = session.options().actions.clone();
  }
  Ok(RunSummary {
    success,
    stats: session.compiler.stats(),
    failed,
    loaded_files: session.loaded_files().map(Path::to_path_buf).collect(),
    caches_saved,
  })
}

fn run(session: &SessionRef) -> Result<bool, BuildError> {
  let lua = runtime::create_runtime(session.clone())?;

  let (start_dir, options) = {
    let session = session.borrow();
    (session.start_dir().to_path_buf(), session.options().clone())
  };

  let project_files = find_project_files(&start_dir, &options.project_file);
  debug!(count = project_files.len(), "project files found");
  for path in &project_files {
    loaders::load_description(&lua, session, path)?;
  }

  if !options.variants.is_empty() {
    let variant = Variant::from(options.variants.clone());
    info!(%variant, "default variant from command line");
    session.borrow_mut().compiler.set_default_variant(variant);
  }

  let build_file = start_dir.join(&options.build_file);
  if !build_file.is_file() {
    return Err(BuildError::config(format!(
      "no build file '{}' in {}",
      options.build_file,
      start_dir.display()
    )));
  }
  loaders::load_description(&lua, session, &build_file)?;

  dispatch::run_actions(&lua, session)
}
