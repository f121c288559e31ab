//! Task execution layer.
//!
//! A [`Task`] is a command line plus the directory and environment it runs
//! in. Commands are submitted through the [`TaskRunner`] trait so the engine
//! can run them for real, print them in dry-run mode, or hand them to a fake
//! toolchain in tests. Filesystem effects go through [`FileManager`].

pub mod fs;
pub mod shell;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub use fs::FileManager;
pub use shell::ShellRunner;

use crate::error::BuildError;

/// An external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
  pub program: String,
  pub args: Vec<String>,
  /// Working directory; always the real path of an execution context.
  pub cwd: PathBuf,
  /// Variables added to the inherited environment.
  pub env: BTreeMap<String, String>,
  /// Progress label such as `<Lib:core>`.
  pub label: Option<String>,
}

impl Task {
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.into(),
      env: BTreeMap::new(),
      label: None,
    }
  }

  /// Build a task from a full argv, the first element being the program.
  pub fn from_argv(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Result<Self, BuildError> {
    let mut parts = argv.into_iter();
    let program = parts
      .next()
      .ok_or_else(|| BuildError::config("cannot run an empty command"))?;
    Ok(Self::new(program, cwd).args(parts))
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn label(mut self, label: impl Into<String>) -> Self {
    self.label = Some(label.into());
    self
  }

  /// Every argv element, program first.
  pub fn argv(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
  }
}

fn quote(arg: &str) -> String {
  if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
    format!("\"{}\"", arg.replace('"', "\\\""))
  } else {
    arg.to_string()
  }
}

impl fmt::Display for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in &self.env {
      write!(f, "{}={} ", key, quote(value))?;
    }
    let line: Vec<String> = self.argv().map(quote).collect();
    write!(f, "{}", line.join(" "))
  }
}

/// Whether the caller needs the command's standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
  /// Output goes straight to the terminal.
  Inherit,
  /// Output is collected into [`TaskOutput::stdout`].
  Stdout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
  pub success: bool,
  pub code: Option<i32>,
  pub stdout: String,
}

impl TaskOutput {
  pub fn succeeded(stdout: impl Into<String>) -> Self {
    Self {
      success: true,
      code: Some(0),
      stdout: stdout.into(),
    }
  }

  pub fn failed(code: Option<i32>) -> Self {
    Self {
      success: false,
      code,
      stdout: String::new(),
    }
  }
}

/// Runs tasks on behalf of the build engine.
pub trait TaskRunner {
  /// Run a task and wait for it.
  ///
  /// A nonzero exit is reported through [`TaskOutput::success`]; `Err` is
  /// reserved for failures to launch and for user cancellation.
  fn submit(&mut self, task: &Task, capture: Capture) -> Result<TaskOutput, BuildError>;

  /// Whether tasks are only printed.
  fn is_dry_run(&self) -> bool {
    false
  }
}

/// Prints every task instead of running it.
#[derive(Debug, Default)]
pub struct DryRunRunner;

impl TaskRunner for DryRunRunner {
  fn submit(&mut self, task: &Task, _capture: Capture) -> Result<TaskOutput, BuildError> {
    match &task.label {
      Some(label) => println!("{} {}", label, task),
      None => println!("{}", task),
    }
    Ok(TaskOutput::succeeded(""))
  }

  fn is_dry_run(&self) -> bool {
    true
  }
}
