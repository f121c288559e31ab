use std::fmt;
use std::path::Path;

use crate::error::BuildError;

/// Source language, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
  C,
  Cxx,
  ObjC,
  ObjCxx,
}

impl Language {
  pub fn from_extension(ext: &str) -> Option<Self> {
    match ext {
      "c" => Some(Self::C),
      "cpp" | "cxx" | "c++" | "cc" => Some(Self::Cxx),
      "m" => Some(Self::ObjC),
      "mm" => Some(Self::ObjCxx),
      _ => None,
    }
  }

  pub fn from_path(path: &str) -> Result<Self, BuildError> {
    Path::new(path)
      .extension()
      .and_then(|ext| ext.to_str())
      .and_then(Self::from_extension)
      .ok_or_else(|| BuildError::config(format!("unknown source language for '{}'", path)))
  }

  /// Linking a mix of languages needs the driver of the highest priority one.
  pub fn priority(self) -> u8 {
    match self {
      Self::Cxx => 3,
      Self::ObjCxx => 2,
      Self::C => 1,
      Self::ObjC => 0,
    }
  }

  /// The language whose driver links a set of sources; C when there are none.
  pub fn dominant<'a>(sources: impl IntoIterator<Item = &'a str>) -> Result<Self, BuildError> {
    let mut best: Option<Self> = None;
    for source in sources {
      let lang = Self::from_path(source)?;
      if best.is_none_or(|b| lang.priority() > b.priority()) {
        best = Some(lang);
      }
    }
    Ok(best.unwrap_or(Self::C))
  }

  /// Compiled with the C++ driver and C++ flags.
  pub fn is_cxx_family(self) -> bool {
    matches!(self, Self::Cxx | Self::ObjCxx)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::C => "C",
      Self::Cxx => "C++",
      Self::ObjC => "ObjC",
      Self::ObjCxx => "ObjC++",
    }
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
