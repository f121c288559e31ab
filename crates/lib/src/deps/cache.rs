//! Persistent per-directory dependency cache.
//!
//! # Storage Layout
//!
//! ```text
//! <build dir>/.bsdeps.json
//! {
//!   "version": 1,
//!   "entries": {
//!     "<declared output>": { "output": "...", "deps": ["a.c", "a.h", "BSFile"] }
//!   }
//! }
//! ```
//!
//! Directories are loaded lazily on first lookup and only rewritten when an
//! entry changed. A missing, unreadable or corrupted file simply yields an
//! empty cache, which forces a rescan.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::{DEPS_CACHE_FILE, DEPS_CACHE_VERSION};

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to serialize dependency cache: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write '{}': {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Dependencies recorded for one declared output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
  /// The output file the dependencies were computed for.
  pub output: String,
  pub deps: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
  version: u32,
  entries: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Default)]
struct DirCache {
  entries: BTreeMap<String, CacheEntry>,
  dirty: bool,
}

#[derive(Debug)]
pub struct DependencyCache {
  dirs: HashMap<PathBuf, DirCache>,
  file_name: String,
}

impl Default for DependencyCache {
  fn default() -> Self {
    Self::new()
  }
}

impl DependencyCache {
  pub fn new() -> Self {
    Self::with_file_name(DEPS_CACHE_FILE)
  }

  pub fn with_file_name(file_name: impl Into<String>) -> Self {
    Self {
      dirs: HashMap::new(),
      file_name: file_name.into(),
    }
  }

  /// Path of the cache file for a directory.
  pub fn cache_path(&self, dir: &Path) -> PathBuf {
    dir.join(&self.file_name)
  }

  fn dir_cache(&mut self, dir: &Path) -> &mut DirCache {
    let path = self.cache_path(dir);
    self.dirs.entry(dir.to_path_buf()).or_insert_with(|| DirCache {
      entries: load_entries(&path),
      dirty: false,
    })
  }

  /// Look up the cached dependencies of a declared output.
  pub fn get(&mut self, dir: &Path, declared: &str) -> Option<&CacheEntry> {
    self.dir_cache(dir).entries.get(declared)
  }

  /// Record (or overwrite) the dependencies of a declared output.
  pub fn set(&mut self, dir: &Path, declared: impl Into<String>, entry: CacheEntry) {
    let cache = self.dir_cache(dir);
    let declared = declared.into();
    if cache.entries.get(&declared) != Some(&entry) {
      cache.entries.insert(declared, entry);
      cache.dirty = true;
    }
  }

  /// Write every modified directory cache back to disk.
  ///
  /// Uses atomic write (write to temp, then rename) to prevent corruption.
  ///
  /// Returns the number of files written.
  pub fn save_all(&mut self) -> Result<usize, CacheError> {
    let mut written = 0;
    for (dir, cache) in self.dirs.iter_mut().filter(|(_, c)| c.dirty) {
      let path = dir.join(&self.file_name);
      let temp_path = dir.join(format!("{}.tmp", self.file_name));

      let file = CacheFile {
        version: DEPS_CACHE_VERSION,
        entries: cache.entries.clone(),
      };
      let content = serde_json::to_string_pretty(&file).map_err(CacheError::Serialize)?;
      fs::write(&temp_path, &content).map_err(|source| CacheError::Write {
        path: temp_path.clone(),
        source,
      })?;
      fs::rename(&temp_path, &path).map_err(|source| CacheError::Write {
        path: path.clone(),
        source,
      })?;

      debug!(path = %path.display(), entries = cache.entries.len(), "saved dependency cache");
      cache.dirty = false;
      written += 1;
    }
    Ok(written)
  }
}

fn load_entries(path: &Path) -> BTreeMap<String, CacheEntry> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "cannot read dependency cache, rescanning");
      return BTreeMap::new();
    }
  };

  match serde_json::from_str::<CacheFile>(&content) {
    Ok(file) if file.version == DEPS_CACHE_VERSION => {
      debug!(path = %path.display(), entries = file.entries.len(), "loaded dependency cache");
      file.entries
    }
    Ok(file) => {
      warn!(path = %path.display(), version = file.version, "unsupported dependency cache version, rescanning");
      BTreeMap::new()
    }
    Err(e) => {
      warn!(path = %path.display(), error = %e, "corrupted dependency cache, rescanning");
      BTreeMap::new()
    }
  }
}
