//! The `run` and `deploy` entry points of applications.

use std::env;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, info};

use super::Compiler;
use crate::env::normalize;
use crate::error::BuildError;
use crate::exec::{Capture, Task};
use crate::target::Target;

pub const RUN_PREFIX_VAR: &str = "BS_RUN_PREFIX";
pub const RUN_SUFFIX_VAR: &str = "BS_RUN_SUFFIX";

fn env_words(name: &str) -> Vec<String> {
  env::var(name)
    .map(|v| v.split_whitespace().map(String::from).collect())
    .unwrap_or_default()
}

impl Compiler {
  fn require_application(&self, target: &Target, action: &str) -> Result<(), BuildError> {
    if target.is_library() {
      return Err(BuildError::config(format!(
        "cannot {} '{}': only applications support it",
        action, target.name
      )));
    }
    Ok(())
  }

  fn application_absolute_path(&self, app: &Target) -> Result<PathBuf, BuildError> {
    Ok(normalize(&app.env.real_path.join(self.application_file_path(app)?)))
  }

  /// Shared libraries an application links directly, as absolute artifact paths.
  fn shared_inputs(&self, app: &Target) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();
    for lib in app.subtargets() {
      if lib.is_shared(self.default_variant()) {
        files.push(normalize(&lib.env.real_path.join(self.library_file_path(lib)?)));
      }
    }
    Ok(files)
  }

  /// Build an application and execute it with `args`.
  ///
  /// The dynamic loader search variable lists the directory of every shared
  /// library linked directly, ahead of any inherited value. `BS_RUN_PREFIX`
  /// and `BS_RUN_SUFFIX` wrap the command line.
  ///
  /// Returns whether the build and the program both succeeded.
  pub fn run_application(&mut self, app: &Rc<Target>, args: &[String]) -> Result<bool, BuildError> {
    self.require_application(app, "run")?;
    if self.build(app)?.is_failed() {
      return Ok(false);
    }

    let exe = self.application_absolute_path(app)?;
    let cwd = exe.parent().map(PathBuf::from).unwrap_or_else(|| app.env.real_path.clone());

    let platform = self.platform().clone();
    let var = platform.shared_library_path_var();
    let mut search: Vec<String> = Vec::new();
    for lib in self.shared_inputs(app)? {
      if let Some(dir) = lib.parent() {
        let dir = dir.to_string_lossy().into_owned();
        if !search.contains(&dir) {
          search.push(dir);
        }
      }
    }

    let mut argv = env_words(RUN_PREFIX_VAR);
    argv.push(exe.to_string_lossy().into_owned());
    argv.extend(args.iter().cloned());
    argv.extend(env_words(RUN_SUFFIX_VAR));

    let mut task = Task::from_argv(argv, cwd)?.label(app.label());
    if !search.is_empty() {
      if let Ok(existing) = env::var(var) {
        if !existing.is_empty() {
          search.push(existing);
        }
      }
      task = task.env(var, search.join(platform.path_list_separator()));
    }

    info!(app = %app.name, "running");
    let output = self.submit(&task, Capture::Inherit)?;
    debug!(app = %app.name, code = ?output.code, "finished");
    Ok(output.success)
  }

  /// Build an application and copy it, with every shared library it links
  /// directly, into `destination` (default `deployed/<name>`).
  ///
  /// A relative destination is resolved against the current context.
  pub fn deploy_application(&mut self, app: &Rc<Target>, destination: Option<&str>) -> Result<bool, BuildError> {
    self.require_application(app, "deploy")?;
    if self.build(app)?.is_failed() {
      return Ok(false);
    }

    let base = self.envs().current().real_path.clone();
    let dst_dir = match destination {
      Some(dir) => normalize(&base.join(dir)),
      None => base.join("deployed").join(&app.name),
    };
    self.files().mkdir(&dst_dir)?;

    let mut sources = vec![self.application_absolute_path(app)?];
    sources.extend(self.shared_inputs(app)?);
    for src in sources {
      let Some(name) = src.file_name() else {
        continue;
      };
      let copied = self.files().copy(&src, &dst_dir.join(name))?;
      println!("Copied {} to {}", src.display(), copied.display());
    }
    Ok(true)
  }
}
