//! Test utilities for bslua-lib.
//!
//! Cross-platform helpers for tests that run real commands or need precise
//! control over file modification times.

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Returns the command and args to echo a message.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("/bin/echo", vec![msg.to_string()])
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo {}", msg)])
}

/// Write a file (creating parents) and stamp it `secs` seconds after a fixed epoch.
pub fn write_at(path: &Path, content: &str, secs: u64) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
  set_mtime(path, secs);
}

/// Set a file's modification time to `secs` seconds after a fixed epoch.
pub fn set_mtime(path: &Path, secs: u64) {
  let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
  let file = File::options().write(true).open(path).unwrap();
  file.set_modified(base + Duration::from_secs(secs)).unwrap();
}
