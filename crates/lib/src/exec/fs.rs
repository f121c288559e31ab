//! Filesystem operations performed on behalf of build steps.
//!
//! In dry-run mode every mutating operation is printed and skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BuildError;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileManager {
  dry_run: bool,
}

impl FileManager {
  pub fn new(dry_run: bool) -> Self {
    Self { dry_run }
  }

  pub fn is_dry_run(&self) -> bool {
    self.dry_run
  }

  /// Create a directory and all of its parents.
  pub fn mkdir(&self, path: &Path) -> Result<(), BuildError> {
    if path.is_dir() {
      return Ok(());
    }
    if self.dry_run {
      println!("mkdir -p {}", path.display());
      return Ok(());
    }
    debug!(path = %path.display(), "creating directory");
    fs::create_dir_all(path).map_err(|source| BuildError::CreateDir {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Delete a file or directory. Missing paths are ignored.
  ///
  /// Non-empty directories are only removed with `force`.
  ///
  /// Returns whether anything was (or in dry-run, would have been) deleted.
  pub fn delete(&self, path: &Path, force: bool) -> Result<bool, BuildError> {
    let meta = match fs::symlink_metadata(path) {
      Ok(meta) => meta,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
      Err(e) => return Err(BuildError::filesystem(path, e)),
    };

    if meta.is_dir() {
      let empty = fs::read_dir(path)
        .map_err(|e| BuildError::filesystem(path, e))?
        .next()
        .is_none();
      if !empty && !force {
        return Err(BuildError::DirectoryNotEmpty(path.to_path_buf()));
      }
      if self.dry_run {
        println!("rm -r {}", path.display());
        return Ok(true);
      }
      let result = if empty {
        fs::remove_dir(path)
      } else {
        fs::remove_dir_all(path)
      };
      result.map_err(|e| BuildError::filesystem(path, e))?;
    } else {
      if self.dry_run {
        println!("rm {}", path.display());
        return Ok(true);
      }
      fs::remove_file(path).map_err(|e| BuildError::filesystem(path, e))?;
    }

    debug!(path = %path.display(), "deleted");
    Ok(true)
  }

  /// Delete a file, then every parent directory left empty, stopping at
  /// `stop_at` (which is never removed).
  pub fn delete_pruning_empty_dirs(&self, path: &Path, stop_at: &Path) -> Result<bool, BuildError> {
    if !self.delete(path, false)? {
      return Ok(false);
    }
    if self.dry_run {
      return Ok(true);
    }

    let mut dir = path.parent();
    while let Some(current) = dir {
      if current == stop_at || !current.starts_with(stop_at) {
        break;
      }
      let is_empty = match fs::read_dir(current) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => break,
      };
      if !is_empty {
        break;
      }
      fs::remove_dir(current).map_err(|e| BuildError::filesystem(current, e))?;
      dir = current.parent();
    }
    Ok(true)
  }

  /// Copy a file. When `dst` is an existing directory the file keeps its name.
  ///
  /// Returns the destination file path.
  pub fn copy(&self, src: &Path, dst: &Path) -> Result<PathBuf, BuildError> {
    let target = if dst.is_dir() {
      match src.file_name() {
        Some(name) => dst.join(name),
        None => return Err(BuildError::config(format!("cannot copy '{}': not a file", src.display()))),
      }
    } else {
      dst.to_path_buf()
    };

    if self.dry_run {
      println!("cp {} {}", src.display(), target.display());
      return Ok(target);
    }

    fs::copy(src, &target).map_err(|e| BuildError::filesystem(src, e))?;
    Ok(target)
  }

  pub fn rename(&self, from: &Path, to: &Path) -> Result<(), BuildError> {
    if self.dry_run {
      println!("mv {} {}", from.display(), to.display());
      return Ok(());
    }
    fs::rename(from, to).map_err(|e| BuildError::filesystem(from, e))
  }
}
