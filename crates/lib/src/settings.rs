//! Compiler-agnostic build settings.
//!
//! A `Settings` value collects defines, flags, search paths and output
//! directories. Directory lookups fall back from the target's own settings to
//! the process-wide defaults and then to a more generic directory class, so a
//! project can set `out_dir` once and have every artifact land there.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::BuildError;

/// Returned when no directory is configured anywhere: the target's own directory.
pub const CURRENT_DIR: &str = ".";

/// Settings shared between the declaring file and every target using them.
pub type SharedSettings = Rc<RefCell<Settings>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
  /// Preprocessor defines; a `None` value emits a bare `-DNAME`.
  pub defines: BTreeMap<String, Option<String>>,
  pub cflags: Vec<String>,
  pub cxxflags: Vec<String>,
  pub frameworks: Vec<String>,
  pub ldflags: Vec<String>,
  pub source_paths: Vec<String>,
  pub dependency_paths: Vec<String>,
  pub include_paths: Vec<String>,
  pub obj_dir: Option<String>,
  pub intermediate_bin_dir: Option<String>,
  pub intermediate_exe_dir: Option<String>,
  pub intermediate_lib_dir: Option<String>,
  pub bin_dir: Option<String>,
  pub exe_dir: Option<String>,
  pub lib_dir: Option<String>,
}

/// An empty string counts as unset.
fn configured(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|v| !v.is_empty())
}

fn first_configured<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
  candidates.iter().copied().find_map(configured)
}

impl Settings {
  pub fn new() -> Self {
    Self::default()
  }

  /// The standard output layout used for process-wide defaults.
  pub fn standard() -> Self {
    Self {
      obj_dir: Some("build/${PLATFORM_FLAVOR}/${VARIANTS}/obj/${TARGET_NAME}".to_string()),
      bin_dir: Some("build/${PLATFORM_FLAVOR}/${VARIANTS}/bin".to_string()),
      lib_dir: Some("build/${PLATFORM_FLAVOR}/${VARIANTS}/lib".to_string()),
      ..Self::default()
    }
  }

  pub fn into_shared(self) -> SharedSettings {
    Rc::new(RefCell::new(self))
  }

  /// Set every destination directory at once.
  pub fn set_out_dir(&mut self, dir: impl Into<String>) {
    let dir = dir.into();
    self.bin_dir = Some(dir.clone());
    self.exe_dir = Some(dir.clone());
    self.lib_dir = Some(dir);
  }

  pub fn define(&mut self, name: impl Into<String>, value: Option<String>) {
    self.defines.insert(name.into(), value);
  }

  // Intermediate directories: local, then default, then destination equivalent.

  pub fn intermediate_dir_for_objects(&self, defaults: &Settings) -> String {
    match first_configured(&[&self.obj_dir, &defaults.obj_dir]) {
      Some(dir) => dir.to_string(),
      None => self.destination_dir_for_binaries(defaults),
    }
  }

  pub fn intermediate_dir_for_binaries(&self, defaults: &Settings) -> String {
    match first_configured(&[&self.intermediate_bin_dir, &defaults.intermediate_bin_dir]) {
      Some(dir) => dir.to_string(),
      None => self.destination_dir_for_binaries(defaults),
    }
  }

  pub fn intermediate_dir_for_executables(&self, defaults: &Settings) -> String {
    match first_configured(&[&self.intermediate_exe_dir, &defaults.intermediate_exe_dir]) {
      Some(dir) => dir.to_string(),
      None => self.intermediate_dir_for_binaries(defaults),
    }
  }

  pub fn intermediate_dir_for_libraries(&self, defaults: &Settings) -> String {
    match first_configured(&[&self.intermediate_lib_dir, &defaults.intermediate_lib_dir]) {
      Some(dir) => dir.to_string(),
      None => self.intermediate_dir_for_binaries(defaults),
    }
  }

  // Destination directories: local, then default, then binaries.

  pub fn destination_dir_for_binaries(&self, defaults: &Settings) -> String {
    first_configured(&[&self.bin_dir, &defaults.bin_dir])
      .unwrap_or(CURRENT_DIR)
      .to_string()
  }

  pub fn destination_dir_for_executables(&self, defaults: &Settings) -> String {
    match first_configured(&[&self.exe_dir, &defaults.exe_dir]) {
      Some(dir) => dir.to_string(),
      None => self.destination_dir_for_binaries(defaults),
    }
  }

  pub fn destination_dir_for_libraries(&self, defaults: &Settings) -> String {
    match first_configured(&[&self.lib_dir, &defaults.lib_dir]) {
      Some(dir) => dir.to_string(),
      None => self.destination_dir_for_binaries(defaults),
    }
  }

  /// Assign a directory setting by its description-file name.
  pub fn set_dir(&mut self, field: &str, value: Option<String>) -> Result<(), BuildError> {
    let slot = match field {
      "obj_dir" => &mut self.obj_dir,
      "intermediate_bin_dir" => &mut self.intermediate_bin_dir,
      "intermediate_exe_dir" => &mut self.intermediate_exe_dir,
      "intermediate_lib_dir" => &mut self.intermediate_lib_dir,
      "bin_dir" => &mut self.bin_dir,
      "exe_dir" => &mut self.exe_dir,
      "lib_dir" => &mut self.lib_dir,
      "out_dir" => {
        match value {
          Some(dir) => self.set_out_dir(dir),
          None => {
            self.bin_dir = None;
            self.exe_dir = None;
            self.lib_dir = None;
          }
        }
        return Ok(());
      }
      other => return Err(BuildError::config(format!("unknown directory setting '{}'", other))),
    };
    *slot = value;
    Ok(())
  }

  /// Mutable access to a list setting by its description-file name.
  pub fn list_mut(&mut self, field: &str) -> Result<&mut Vec<String>, BuildError> {
    match field {
      "cflags" => Ok(&mut self.cflags),
      "cxxflags" => Ok(&mut self.cxxflags),
      "frameworks" => Ok(&mut self.frameworks),
      "ldflags" => Ok(&mut self.ldflags),
      "source_paths" => Ok(&mut self.source_paths),
      "dependency_paths" => Ok(&mut self.dependency_paths),
      "include_paths" => Ok(&mut self.include_paths),
      other => Err(BuildError::config(format!("unknown list setting '{}'", other))),
    }
  }

  pub fn is_dir_field(field: &str) -> bool {
    matches!(
      field,
      "obj_dir"
        | "intermediate_bin_dir"
        | "intermediate_exe_dir"
        | "intermediate_lib_dir"
        | "bin_dir"
        | "exe_dir"
        | "lib_dir"
        | "out_dir"
    )
  }
}

impl fmt::Display for Settings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Settings[")?;
    writeln!(f, "    defines={:?}", self.defines)?;
    let lists = [
      ("source_paths", &self.source_paths),
      ("dependency_paths", &self.dependency_paths),
      ("include_paths", &self.include_paths),
    ];
    for (name, values) in lists {
      if !values.is_empty() {
        writeln!(f, "    {}={:?}", name, values)?;
      }
    }
    let dirs = [
      ("obj_dir", &self.obj_dir),
      ("intermediate_bin_dir", &self.intermediate_bin_dir),
      ("intermediate_exe_dir", &self.intermediate_exe_dir),
      ("intermediate_lib_dir", &self.intermediate_lib_dir),
      ("bin_dir", &self.bin_dir),
      ("exe_dir", &self.exe_dir),
      ("lib_dir", &self.lib_dir),
    ];
    for (name, value) in dirs {
      if let Some(dir) = configured(value) {
        writeln!(f, "    {}={}", name, dir)?;
      }
    }
    write!(f, "]")
  }
}
