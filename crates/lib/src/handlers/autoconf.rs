//! Autoconf projects: `configure`, `make`, `make test`, `make install`.
//!
//! Every step runs inside the build directory, which may differ from the
//! source directory for out-of-tree builds. The configure script is reached
//! through a path relative to the build directory.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::compiler::Compiler;
use crate::env::{Environment, join_path, normalize, path_diff};
use crate::error::BuildError;
use crate::exec::{Capture, Task};
use crate::platform::Flavor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoconfStep {
  Configure,
  Build,
  Test,
  Install,
}

impl AutoconfStep {
  pub const DEFAULT: [AutoconfStep; 3] = [Self::Configure, Self::Build, Self::Install];

  pub fn parse(name: &str) -> Result<Self, BuildError> {
    match name {
      "configure" => Ok(Self::Configure),
      "build" => Ok(Self::Build),
      "test" => Ok(Self::Test),
      "install" => Ok(Self::Install),
      other => Err(BuildError::config(format!("unknown autoconf step '{}'", other))),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Configure => "configure",
      Self::Build => "build",
      Self::Test => "test",
      Self::Install => "install",
    }
  }
}

impl fmt::Display for AutoconfStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone)]
pub struct AutoconfProject {
  pub name: String,
  /// Directory holding the configure script, relative to `env`.
  pub source_dir: String,
  /// Directory the steps run in; defaults to `source_dir`.
  pub build_dir: String,
  pub steps: Vec<AutoconfStep>,
  pub conf_flags: Vec<String>,
  pub build_flags: Vec<String>,
  pub install_flags: Vec<String>,
  pub conf_cmd: String,
  pub make_cmd: String,
  /// Context the project was declared in.
  pub env: Environment,
}

impl AutoconfProject {
  pub fn new(name: impl Into<String>, source_dir: impl Into<String>, env: Environment) -> Self {
    let source_dir = source_dir.into();
    Self {
      name: name.into(),
      build_dir: source_dir.clone(),
      source_dir,
      steps: AutoconfStep::DEFAULT.to_vec(),
      conf_flags: Vec::new(),
      build_flags: Vec::new(),
      install_flags: Vec::new(),
      conf_cmd: "configure".to_string(),
      make_cmd: "make".to_string(),
      env,
    }
  }

  pub fn label(&self) -> String {
    format!("<Autoconf:{}>", self.name)
  }

  fn source_path(&self) -> PathBuf {
    normalize(&self.env.real_path.join(&self.source_dir))
  }

  fn build_path(&self) -> PathBuf {
    normalize(&self.env.real_path.join(&self.build_dir))
  }

  /// Command line of one step.
  pub fn command(&self, step: AutoconfStep, flavor: Flavor) -> Vec<String> {
    let mut argv = Vec::new();
    match step {
      AutoconfStep::Configure => {
        // MinGW cannot launch the script directly.
        if flavor == Flavor::MinGw {
          argv.push("sh".to_string());
        }
        let relative = path_diff(&self.build_path(), &self.source_path());
        if relative == "." {
          argv.push(format!("./{}", self.conf_cmd));
        } else {
          argv.push(join_path(&relative, &self.conf_cmd));
        }
        argv.extend(self.conf_flags.iter().cloned());
      }
      AutoconfStep::Build => {
        argv.push(self.make_cmd.clone());
        argv.extend(self.build_flags.iter().cloned());
      }
      AutoconfStep::Test => {
        argv.push(self.make_cmd.clone());
        argv.push("test".to_string());
      }
      AutoconfStep::Install => {
        argv.push(self.make_cmd.clone());
        argv.extend(self.install_flags.iter().cloned());
        argv.push("install".to_string());
      }
    }
    argv
  }

  /// Run every step in order, stopping at the first failure.
  ///
  /// A failing step is recorded as a failed target and reported as `false`.
  pub fn run(&self, compiler: &mut Compiler) -> Result<bool, BuildError> {
    let build_path = self.build_path();
    compiler.files().mkdir(&build_path)?;

    let start = compiler.envs().root().real_path.clone();
    compiler.envs_mut().push(Environment::for_dir(&start, build_path.clone()));
    let result = self.run_steps(compiler, &build_path);
    compiler.envs_mut().pop();

    let ok = result?;
    if !ok {
      compiler.record_failure(self.name.clone());
    }
    Ok(ok)
  }

  fn run_steps(&self, compiler: &mut Compiler, build_path: &Path) -> Result<bool, BuildError> {
    let flavor = compiler.platform().flavor;
    for step in &self.steps {
      info!(project = %self.name, %step, "running");
      let task = Task::from_argv(self.command(*step, flavor), build_path)?.label(self.label());
      let output = compiler.submit(&task, Capture::Inherit)?;
      if !output.success {
        error!(project = %self.name, %step, code = ?output.code, "step failed");
        return Ok(false);
      }
    }
    Ok(true)
  }

  /// Delete the build directory, whatever it contains.
  pub fn clean(&self, compiler: &mut Compiler) -> Result<bool, BuildError> {
    let build_path = self.build_path();
    println!("Cleaning: {}", build_path.display());
    compiler.files().delete(&build_path, true)
  }
}
