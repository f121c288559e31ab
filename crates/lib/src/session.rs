//! State of one `bs` invocation.
//!
//! The session owns the compiler (and with it the execution context stack),
//! the declaration registry and the loaded-file bookkeeping. Lua callbacks
//! reach it through a shared [`SessionRef`]; no borrow of the session is ever
//! held while Lua code runs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::compiler::{BuildOptions, Compiler, Toolchain};
use crate::consts::{DEFAULT_BUILD_FILE, DEFAULT_PROJECT_FILE};
use crate::env::Environment;
use crate::error::BuildError;
use crate::exec::TaskRunner;
use crate::platform::PlatformInfo;
use crate::target::{Registry, Target, TargetDecl};

pub type SessionRef = Rc<RefCell<Session>>;

/// Everything the command line decides.
#[derive(Debug, Clone)]
pub struct SessionOptions {
  pub build_file: String,
  pub project_file: String,
  /// Replaces the default variant once project files are loaded.
  pub variants: Vec<String>,
  pub actions: Vec<String>,
  /// Passthrough arguments handed to actions.
  pub args: Vec<String>,
  pub build: BuildOptions,
}

impl Default for SessionOptions {
  fn default() -> Self {
    Self {
      build_file: DEFAULT_BUILD_FILE.to_string(),
      project_file: DEFAULT_PROJECT_FILE.to_string(),
      variants: Vec::new(),
      actions: Vec::new(),
      args: Vec::new(),
      build: BuildOptions::default(),
    }
  }
}

pub struct Session {
  pub compiler: Compiler,
  pub registry: Registry,
  /// Real path of each loaded description file and how often it was requested.
  loaded: BTreeMap<PathBuf, usize>,
  start_dir: PathBuf,
  options: SessionOptions,
}

impl Session {
  /// `start_dir` must be canonical; it is the root execution context.
  pub fn new(start_dir: PathBuf, options: SessionOptions, platform: PlatformInfo, runner: Box<dyn TaskRunner>) -> Self {
    Self::with_toolchain(start_dir, options, Toolchain::from_env(platform), runner)
  }

  pub fn with_toolchain(start_dir: PathBuf, options: SessionOptions, toolchain: Toolchain, runner: Box<dyn TaskRunner>) -> Self {
    let root = Environment::new(".", start_dir.clone(), None);
    Self {
      compiler: Compiler::new(toolchain, options.build, root, runner),
      registry: Registry::new(),
      loaded: BTreeMap::new(),
      start_dir,
      options,
    }
  }

  pub fn into_shared(self) -> SessionRef {
    Rc::new(RefCell::new(self))
  }

  pub fn start_dir(&self) -> &Path {
    &self.start_dir
  }

  pub fn options(&self) -> &SessionOptions {
    &self.options
  }

  pub fn current_env(&self) -> &Environment {
    self.compiler.envs().current()
  }

  /// Register a target declared in the current context.
  pub fn declare(&mut self, decl: TargetDecl) -> Result<Rc<Target>, BuildError> {
    let env = self.current_env().clone();
    let target = self.registry.declare(decl, env)?;
    debug!(target = %target.name, kind = target.type_tag(), "declared");
    Ok(target)
  }

  /// Record a load request. Returns `false` when the file was already loaded.
  pub fn mark_loaded(&mut self, real_path: &Path) -> bool {
    let count = self.loaded.entry(real_path.to_path_buf()).or_insert(0);
    *count += 1;
    *count == 1
  }

  pub fn loaded_files(&self) -> impl Iterator<Item = &Path> {
    self.loaded.keys().map(PathBuf::as_path)
  }
}
