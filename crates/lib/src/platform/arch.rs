use std::fmt;

/// Code generation target selected through `BS_PLATFORM_ARCH`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Arch {
  /// No architecture flags
  #[default]
  None,
  /// Tune for the build machine
  Native,
  /// A specific `-march` value
  March(String),
}

impl Arch {
  pub fn parse(value: &str) -> Self {
    match value.trim() {
      "" | "none" => Self::None,
      "native" => Self::Native,
      other => Self::March(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::None => "none",
      Self::Native => "native",
      Self::March(name) => name,
    }
  }

  /// Compile flags for this architecture
  pub fn compile_flags(&self) -> Vec<String> {
    match self {
      Self::None => Vec::new(),
      Self::Native => vec!["-mtune=native".to_string()],
      Self::March(name) => vec![format!("-march={}", name)],
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
