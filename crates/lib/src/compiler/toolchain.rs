//! GCC-family toolchain description.
//!
//! Holds the artifact naming formats of the target platform, the driver and
//! archiver command lines, and the translation of variant tags into compile
//! and link flags. Nothing here touches the filesystem.

use std::collections::BTreeMap;
use std::env;

use super::language::Language;
use crate::platform::PlatformInfo;
use crate::template::format_name;
use crate::variant::Variant;

pub const CC_VAR: &str = "CC";
pub const CXX_VAR: &str = "CXX";
pub const AR_VAR: &str = "AR";
pub const CFLAGS_VAR: &str = "CFLAGS";
pub const CXXFLAGS_VAR: &str = "CXXFLAGS";

/// Artifact naming for one platform. Every format uses `${NAME}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingFormats {
  pub application: &'static str,
  pub object: &'static str,
  pub shared_library: &'static str,
  pub static_library: &'static str,
  pub shared_library_flags: &'static [&'static str],
  /// Shared links also produce an import library (`-Wl,--out-implib`).
  pub import_library: bool,
  /// `-framework` is understood by the linker.
  pub frameworks: bool,
}

impl NamingFormats {
  pub fn for_platform(platform: &PlatformInfo) -> Self {
    if platform.is_windows() {
      Self {
        application: "${NAME}.exe",
        object: "${NAME}.o",
        shared_library: "${NAME}.dll",
        static_library: "lib${NAME}.a",
        shared_library_flags: &["-shared"],
        import_library: true,
        frameworks: false,
      }
    } else if platform.is_macosx() {
      Self {
        application: "${NAME}",
        object: "${NAME}.o",
        shared_library: "lib${NAME}.dylib",
        static_library: "lib${NAME}.a",
        shared_library_flags: &["-Wl,-single_module", "-dynamiclib"],
        import_library: false,
        frameworks: true,
      }
    } else {
      Self {
        application: "${NAME}",
        object: "${NAME}.o",
        shared_library: "lib${NAME}.so",
        static_library: "lib${NAME}.a",
        shared_library_flags: &["-shared"],
        import_library: false,
        frameworks: false,
      }
    }
  }

  pub fn library_file(&self, name: &str, shared: bool) -> String {
    if shared {
      format_name(self.shared_library, name)
    } else {
      format_name(self.static_library, name)
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
  Gcc,
  Clang,
}

/// What a link step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
  Application,
  SharedLibrary,
  StaticLibrary,
}

#[derive(Debug, Clone)]
pub struct Toolchain {
  pub platform: PlatformInfo,
  pub formats: NamingFormats,
  c_driver: Vec<String>,
  cxx_driver: Vec<String>,
  archiver: Vec<String>,
  env_cflags: Vec<String>,
  env_cxxflags: Vec<String>,
  family: Family,
}

fn words(value: &str) -> Vec<String> {
  value.split_whitespace().map(String::from).collect()
}

fn env_words(name: &str) -> Option<Vec<String>> {
  env::var(name).ok().map(|v| words(&v)).filter(|w| !w.is_empty())
}

impl Toolchain {
  /// Plain `gcc`/`g++`/`ar` with no extra flags.
  pub fn new(platform: PlatformInfo) -> Self {
    Self {
      formats: NamingFormats::for_platform(&platform),
      platform,
      c_driver: vec!["gcc".to_string()],
      cxx_driver: vec!["g++".to_string()],
      archiver: vec!["ar".to_string()],
      env_cflags: Vec::new(),
      env_cxxflags: Vec::new(),
      family: Family::Gcc,
    }
  }

  /// Honor `CC`, `CXX`, `AR`, `CFLAGS` and `CXXFLAGS`.
  pub fn from_env(platform: PlatformInfo) -> Self {
    let mut toolchain = Self::new(platform);
    if let Some(cc) = env_words(CC_VAR) {
      toolchain.c_driver = cc;
    }
    if let Some(cxx) = env_words(CXX_VAR) {
      toolchain.cxx_driver = cxx;
    }
    if let Some(ar) = env_words(AR_VAR) {
      toolchain.archiver = ar;
    }
    toolchain.env_cflags = env_words(CFLAGS_VAR).unwrap_or_default();
    toolchain.env_cxxflags = env_words(CXXFLAGS_VAR).unwrap_or_default();
    let mentions_clang = |driver: &[String]| driver.iter().any(|w| w.contains("clang"));
    if mentions_clang(&toolchain.c_driver) || mentions_clang(&toolchain.cxx_driver) {
      toolchain.family = Family::Clang;
    }
    toolchain
  }

  pub fn with_drivers(mut self, c_driver: &str, cxx_driver: &str) -> Self {
    self.c_driver = words(c_driver);
    self.cxx_driver = words(cxx_driver);
    self
  }

  pub fn with_family(mut self, family: Family) -> Self {
    self.family = family;
    self
  }

  pub fn family(&self) -> Family {
    self.family
  }

  pub fn driver(&self, language: Language) -> &[String] {
    if language.is_cxx_family() {
      &self.cxx_driver
    } else {
      &self.c_driver
    }
  }

  pub fn archiver(&self) -> &[String] {
    &self.archiver
  }

  /// Value of the `VARIANTS` template variable.
  pub fn variants_label(variant: &Variant) -> String {
    let mut parts = Vec::new();
    if variant.contains("debug") {
      parts.push("debug");
    }
    if variant.contains("release") {
      parts.push("release");
    }
    parts.push(if variant.contains("multi-thread") { "multi" } else { "single" });
    parts.join("_")
  }

  /// Flags a variant adds when compiling a source of `language`.
  pub fn compile_flags(&self, variant: &Variant, language: Language) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    let mut add = |items: &[&str]| flags.extend(items.iter().map(|s| s.to_string()));

    if variant.contains("warnings") {
      add(&["-Wall"]);
    }
    if variant.contains("release") {
      add(&["-O2"]);
    }
    if variant.contains("debug") {
      add(&["-ggdb", "-O0", "-D_DEBUG"]);
    }
    if variant.contains("pic") {
      add(&["-fPIC"]);
    }
    if variant.contains("asm") && self.platform.is_macosx() {
      add(&["-fasm-blocks"]);
    }
    if variant.contains("sse") {
      add(&["-msse", "-msse2", "-msse3", "-mssse3"]);
      if self.family == Family::Gcc {
        add(&["-mfpmath=sse", "-ftree-vectorize"]);
      }
    }
    if language.is_cxx_family() {
      if !variant.contains("rtti") {
        add(&["-fno-rtti"]);
      }
      if !variant.contains("exceptions") {
        add(&["-fno-exceptions"]);
      }
      if variant.contains("C++11") {
        add(&["-std=c++0x"]);
      } else if self.family == Family::Clang {
        if variant.contains("c++0x") {
          add(&["-std=c++0x"]);
        } else if variant.contains("g++0x") {
          add(&["-std=gnu++0x"]);
        }
      }
    }
    if variant.contains("multi-thread") && self.platform.is_posix_threads() {
      add(&["-pthread"]);
    }
    if variant.contains("osx_pascal_strings") && self.platform.is_macosx() {
      add(&["-fpascal-strings"]);
    }

    flags.extend(self.platform.arch.compile_flags());
    if language.is_cxx_family() {
      flags.extend(self.env_cxxflags.iter().cloned());
    }
    flags.extend(self.env_cflags.iter().cloned());
    flags
  }

  /// Flags a variant adds when linking.
  pub fn link_flags(&self, variant: &Variant, kind: LinkKind) -> Vec<String> {
    let mut flags = Vec::new();
    let links_threads = matches!(kind, LinkKind::Application | LinkKind::SharedLibrary);
    if links_threads && variant.contains("multi-thread") && self.platform.is_posix_threads() {
      flags.push("-pthread".to_string());
    }
    flags
  }

  pub fn define_flags(defines: &BTreeMap<String, Option<String>>) -> Vec<String> {
    defines
      .iter()
      .map(|(name, value)| match value {
        Some(value) => format!("-D{}={}", name, value),
        None => format!("-D{}", name),
      })
      .collect()
  }

  pub fn include_flags(paths: &[String]) -> Vec<String> {
    paths.iter().map(|p| format!("-I{}", p)).collect()
  }

  pub fn library_flags(dir: &str, name: &str) -> [String; 2] {
    [format!("-L{}", dir), format!("-l{}", name)]
  }

  /// Framework flags; empty where frameworks do not exist.
  pub fn framework_flags(&self, frameworks: &[String]) -> Vec<String> {
    if !self.formats.frameworks {
      return Vec::new();
    }
    frameworks
      .iter()
      .flat_map(|f| ["-framework".to_string(), f.clone()])
      .collect()
  }

  /// Import library flag for a shared library link, where the platform has one.
  pub fn import_library_flags(&self, dir: &str, name: &str) -> Vec<String> {
    if !self.formats.import_library {
      return Vec::new();
    }
    let import = crate::env::join_path(dir, &format_name(self.formats.static_library, name));
    vec![format!("-Wl,--out-implib,{}", import)]
  }
}
