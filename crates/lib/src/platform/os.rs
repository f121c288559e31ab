use std::fmt;

/// Platform family a build targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
  Unix,
  Windows,
}

impl Platform {
  /// Detect the host platform family at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" | "macos" => Some(Self::Unix),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "unix" => Some(Self::Unix),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier used in templates and Lua
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Unix => "unix",
      Self::Windows => "windows",
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Concrete flavor of a platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
  Linux,
  MacOsX,
  MinGw,
}

impl Flavor {
  /// Detect the host flavor at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOsX),
      "windows" => Some(Self::MinGw),
      _ => None,
    }
  }

  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "linux" => Some(Self::Linux),
      "macosx" => Some(Self::MacOsX),
      "mingw" => Some(Self::MinGw),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOsX => "macosx",
      Self::MinGw => "mingw",
    }
  }

  /// The platform family this flavor belongs to
  pub fn platform(&self) -> Platform {
    match self {
      Self::Linux | Self::MacOsX => Platform::Unix,
      Self::MinGw => Platform::Windows,
    }
  }
}

impl fmt::Display for Flavor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
