//! Host platform detection with environment overrides.
//!
//! The platform family, flavor, version and architecture feed the naming
//! formats, the variant flags and the `PLATFORM`/`PLATFORM_FLAVOR` template
//! variables. Each can be overridden through a `BS_PLATFORM*` variable, which
//! also allows cross builds from a host that is not supported natively.

pub mod arch;
pub mod os;

use std::env;
use std::fmt;

pub use arch::Arch;
pub use os::{Flavor, Platform};

use crate::error::BuildError;

pub const PLATFORM_VAR: &str = "BS_PLATFORM";
pub const FLAVOR_VAR: &str = "BS_PLATFORM_FLAVOR";
pub const VERSION_VAR: &str = "BS_PLATFORM_VERSION";
pub const ARCH_VAR: &str = "BS_PLATFORM_ARCH";

/// Resolved description of the platform being built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
  pub platform: Platform,
  pub flavor: Flavor,
  pub version: Option<String>,
  pub arch: Arch,
}

fn env_override(name: &str) -> Option<String> {
  env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl PlatformInfo {
  /// A platform with no version and no architecture flags.
  pub fn new(flavor: Flavor) -> Self {
    Self {
      platform: flavor.platform(),
      flavor,
      version: None,
      arch: Arch::None,
    }
  }

  /// Detect the host platform, honoring `BS_PLATFORM*` overrides.
  ///
  /// # Errors
  ///
  /// Returns a configuration error when an override names an unknown value or
  /// when the host is unsupported and no override is set.
  pub fn detect() -> Result<Self, BuildError> {
    let flavor = match env_override(FLAVOR_VAR) {
      Some(name) => Flavor::parse(&name)
        .ok_or_else(|| BuildError::config(format!("unsupported platform flavor '{}' in {}", name, FLAVOR_VAR)))?,
      None => Flavor::current().ok_or_else(|| {
        BuildError::config(format!(
          "unsupported platform '{}' (set {} to override)",
          env::consts::OS,
          FLAVOR_VAR
        ))
      })?,
    };

    let platform = match env_override(PLATFORM_VAR) {
      Some(name) => Platform::parse(&name)
        .ok_or_else(|| BuildError::config(format!("unsupported platform '{}' in {}", name, PLATFORM_VAR)))?,
      None => flavor.platform(),
    };

    Ok(Self {
      platform,
      flavor,
      version: env_override(VERSION_VAR),
      arch: env_override(ARCH_VAR).map(|a| Arch::parse(&a)).unwrap_or_default(),
    })
  }

  pub fn is_windows(&self) -> bool {
    self.platform == Platform::Windows
  }

  pub fn is_macosx(&self) -> bool {
    self.flavor == Flavor::MacOsX
  }

  /// Unix, but not macOS; where `-pthread` applies.
  pub fn is_posix_threads(&self) -> bool {
    self.platform == Platform::Unix && !self.is_macosx()
  }

  /// Environment variable the dynamic loader searches for shared libraries.
  pub fn shared_library_path_var(&self) -> &'static str {
    if self.is_windows() {
      return "PATH";
    }
    match self.flavor {
      Flavor::MacOsX => "DYLD_LIBRARY_PATH",
      Flavor::Linux | Flavor::MinGw => "LD_LIBRARY_PATH",
    }
  }

  /// Separator for search path lists such as `PATH`.
  pub fn path_list_separator(&self) -> &'static str {
    if self.is_windows() { ";" } else { ":" }
  }
}

impl fmt::Display for PlatformInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.platform, self.flavor)?;
    if let Some(version) = &self.version {
      write!(f, "-{}", version)?;
    }
    Ok(())
  }
}
