//! Description file loading with per-file `__dir` and `__file` injection.
//!
//! Each file runs with its own environment table holding `__dir` (the
//! directory of the file) and `__file` (its name). Reads and writes of any
//! other name go to the shared globals, so a global declared in one file is
//! visible to every file loaded after it.
//!
//! While a file runs, its directory is the current execution context: targets
//! declared in it resolve their sources there, and nested `bs.load` calls are
//! relative to it.

use std::fs;
use std::path::Path;

use mlua::prelude::*;
use tracing::debug;

use crate::env::{Environment, path_diff};
use crate::error::BuildError;
use crate::session::SessionRef;

/// Load and execute a description file.
///
/// Loading a file whose real path was already loaded does nothing.
///
/// Returns whether the file was executed.
pub fn load_description(lua: &Lua, session: &SessionRef, path: &Path) -> LuaResult<bool> {
  let canonical_path = dunce::canonicalize(path)
    .map_err(|e| BuildError::config(format!("cannot resolve '{}': {}", path.display(), e)))?;

  if !session.borrow_mut().mark_loaded(&canonical_path) {
    debug!(path = %canonical_path.display(), "already loaded");
    return Ok(false);
  }

  let content = fs::read_to_string(&canonical_path)
    .map_err(|e| BuildError::config(format!("cannot read '{}': {}", canonical_path.display(), e)))?;

  let dir = canonical_path.parent().unwrap_or(Path::new(".")).to_path_buf();
  let file = canonical_path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();

  // Create environment table with __dir and __file
  let env = lua.create_table()?;
  env.set("__dir", dir.to_string_lossy().into_owned())?;
  env.set("__file", file.clone())?;

  // Inherit from _G via metatable
  let mt = lua.create_table()?;
  mt.set("__index", lua.globals())?;
  mt.set("__newindex", lua.globals())?;
  env.set_metatable(Some(mt))?;

  let context = {
    let session = session.borrow();
    Environment::new(path_diff(session.start_dir(), &dir), dir.clone(), Some(file))
  };
  debug!(path = %canonical_path.display(), "loading");
  session.borrow_mut().compiler.envs_mut().push(context);

  let result = lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .set_environment(env)
    .exec();

  session.borrow_mut().compiler.envs_mut().pop();
  result.map(|_| true)
}

/// Resolve a path named in a description file against the current context.
pub fn resolve_in_current(session: &SessionRef, path: &str) -> std::path::PathBuf {
  session.borrow().current_env().resolve(path)
}
