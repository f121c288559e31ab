//! Execution contexts.
//!
//! Every relative path in a description file is relative to the directory of
//! that file. Instead of changing the process working directory, the engine
//! keeps an explicit stack of contexts and resolves paths against the top.

use std::path::{Component, Path, PathBuf};

/// The directory a description file (or target) lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Environment {
  /// Path relative to the invocation directory, for display.
  pub path: PathBuf,
  /// Canonical absolute path.
  pub real_path: PathBuf,
  /// Name of the description file, if the context was created by loading one.
  pub filename: Option<String>,
}

impl Environment {
  pub fn new(path: impl Into<PathBuf>, real_path: impl Into<PathBuf>, filename: Option<String>) -> Self {
    Self {
      path: path.into(),
      real_path: real_path.into(),
      filename,
    }
  }

  /// Context for a directory without a description file.
  pub fn for_dir(start_dir: &Path, real_path: impl Into<PathBuf>) -> Self {
    let real_path = real_path.into();
    Self {
      path: PathBuf::from(path_diff(start_dir, &real_path)),
      real_path,
      filename: None,
    }
  }

  /// Resolve a path declared in this context.
  pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
    self.real_path.join(path)
  }
}

/// Stack of execution contexts. The bottom entry is never popped, so there
/// is always a current context.
#[derive(Debug, Clone)]
pub struct EnvStack {
  stack: Vec<Environment>,
}

impl EnvStack {
  pub fn new(root: Environment) -> Self {
    Self { stack: vec![root] }
  }

  pub fn current(&self) -> &Environment {
    // The root entry is never popped.
    &self.stack[self.stack.len() - 1]
  }

  pub fn root(&self) -> &Environment {
    &self.stack[0]
  }

  pub fn push(&mut self, env: Environment) {
    self.stack.push(env);
  }

  /// Pop the current context. Returns `None` instead of popping the root.
  pub fn pop(&mut self) -> Option<Environment> {
    if self.stack.len() > 1 { self.stack.pop() } else { None }
  }

  pub fn depth(&self) -> usize {
    self.stack.len()
  }
}

/// Lexically normalize a path, folding `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !out.pop() {
          out.push("..");
        }
      }
      other => out.push(other),
    }
  }
  out
}

/// Relative path leading from `from` to `to`.
///
/// Both paths are expected to be absolute and canonical. Returns `"."` when
/// they are the same directory.
pub fn path_diff(from: &Path, to: &Path) -> String {
  let from_parts: Vec<Component> = from.components().collect();
  let to_parts: Vec<Component> = to.components().collect();
  let common = from_parts
    .iter()
    .zip(to_parts.iter())
    .take_while(|(a, b)| a == b)
    .count();

  let mut rel = PathBuf::new();
  for _ in common..from_parts.len() {
    rel.push("..");
  }
  for part in &to_parts[common..] {
    rel.push(part);
  }

  if rel.as_os_str().is_empty() {
    ".".to_string()
  } else {
    rel.to_string_lossy().into_owned()
  }
}

/// Shortest way to name `to` from `from`: the relative path, or the absolute
/// one when that is shorter.
pub fn path_to_reach(from: &Path, to: &Path) -> String {
  let relative = path_diff(from, to);
  let absolute = to.to_string_lossy();
  if absolute.len() < relative.len() {
    absolute.into_owned()
  } else {
    relative
  }
}

/// Join two path strings and normalize the result.
pub fn join_path(base: &str, rest: &str) -> String {
  normalize(&Path::new(base).join(rest)).to_string_lossy().into_owned()
}
