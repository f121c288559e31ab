//! Runs tasks as real subprocesses.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use super::{Capture, Task, TaskOutput, TaskRunner};
use crate::error::BuildError;

/// Executes tasks with `std::process::Command`, echoing each command line.
#[derive(Debug, Default)]
pub struct ShellRunner {
  interrupted: Option<Arc<AtomicBool>>,
}

impl ShellRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Observe a flag set by an interrupt handler. Once set, the running task
  /// is reported as a cancellation instead of a failure.
  pub fn with_interrupt_flag(flag: Arc<AtomicBool>) -> Self {
    Self {
      interrupted: Some(flag),
    }
  }

  fn check_interrupted(&self) -> Result<(), BuildError> {
    match &self.interrupted {
      Some(flag) if flag.load(Ordering::SeqCst) => Err(BuildError::Interrupted),
      _ => Ok(()),
    }
  }
}

impl TaskRunner for ShellRunner {
  fn submit(&mut self, task: &Task, capture: Capture) -> Result<TaskOutput, BuildError> {
    self.check_interrupted()?;

    if capture == Capture::Inherit {
      match &task.label {
        Some(label) => println!("{} {}", label, task),
        None => println!("{}", task),
      }
      // Keep our echo ahead of the child's output.
      let _ = std::io::stdout().flush();
    }

    debug!(program = %task.program, cwd = ?task.cwd, "spawning process");

    let mut command = Command::new(&task.program);
    command.args(&task.args).current_dir(&task.cwd).envs(&task.env);

    let spawn_err = |source| BuildError::Spawn {
      program: task.program.clone(),
      source,
    };

    let result = match capture {
      Capture::Inherit => {
        let status = command.status().map_err(spawn_err)?;
        TaskOutput {
          success: status.success(),
          code: status.code(),
          stdout: String::new(),
        }
      }
      Capture::Stdout => {
        let output = command.stderr(Stdio::inherit()).output().map_err(spawn_err)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!(stdout = %stdout, "captured output");
        TaskOutput {
          success: output.status.success(),
          code: output.status.code(),
          stdout,
        }
      }
    };

    self.check_interrupted()?;

    if !result.success {
      debug!(program = %task.program, code = ?result.code, "command failed");
    }

    Ok(result)
  }
}
