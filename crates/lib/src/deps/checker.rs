//! Timestamp-based staleness decisions.
//!
//! Modification times are cached per directory for the whole run. When a
//! dependency is found newer than an output, the output is marked
//! outstanding: it is about to be rewritten, so its cached time is refreshed
//! the next time anybody asks for it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct TimestampChecker {
  times: HashMap<PathBuf, HashMap<String, SystemTime>>,
  outstanding: HashMap<PathBuf, HashSet<String>>,
}

fn read_mtime(path: &Path) -> Option<SystemTime> {
  fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl TimestampChecker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Modification time of `file` (relative to `dir`), cached for the run.
  pub fn time(&mut self, dir: &Path, file: &str) -> Option<SystemTime> {
    let refresh = self
      .outstanding
      .get_mut(dir)
      .is_some_and(|pending| pending.remove(file));

    let dir_times = self.times.entry(dir.to_path_buf()).or_default();
    if !refresh {
      if let Some(time) = dir_times.get(file) {
        return Some(*time);
      }
    }

    let time = read_mtime(&dir.join(file))?;
    dir_times.insert(file.to_string(), time);
    Some(time)
  }

  /// Mark an output as about to be rewritten.
  pub fn add_outstanding(&mut self, dir: &Path, file: &str) {
    self
      .outstanding
      .entry(dir.to_path_buf())
      .or_default()
      .insert(file.to_string());
  }

  /// Drop the cached time of a file that was just (re)written.
  pub fn forget(&mut self, dir: &Path, file: &str) {
    if let Some(dir_times) = self.times.get_mut(dir) {
      dir_times.remove(file);
    }
    if let Some(pending) = self.outstanding.get_mut(dir) {
      pending.remove(file);
    }
  }

  /// Whether `output` must be rebuilt given its dependencies.
  ///
  /// Stale when the output is missing, when any dependency is missing, or
  /// when any dependency is strictly newer than the output.
  pub fn is_stale(&mut self, dir: &Path, output: &str, deps: &[String]) -> bool {
    if !dir.join(output).exists() {
      debug!(output, "needs to be created");
      return true;
    }
    let Some(output_time) = self.time(dir, output) else {
      debug!(output, "cannot read modification time");
      return true;
    };

    for dep in deps {
      if !dir.join(dep).exists() {
        debug!(output, dep = %dep, "needs updating because a dependency got deleted");
        return true;
      }
      let Some(dep_time) = self.time(dir, dep) else {
        return true;
      };
      trace!(dep = %dep, ?dep_time, ?output_time, "comparing");
      if dep_time > output_time {
        self.add_outstanding(dir, output);
        debug!(output, dep = %dep, "needs updating");
        return true;
      }
    }

    false
  }
}
