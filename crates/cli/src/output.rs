//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output: colored status
//! messages, human-readable durations and the build summary.

use std::time::Duration;

use owo_colors::{OwoColorize, Stream};

use bslua_lib::compiler::BuildStats;

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

fn plural(count: usize, word: &str) -> String {
  if count == 1 {
    format!("{} {}", count, word)
  } else {
    format!("{} {}s", count, word)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// One-line description of what a run did.
pub fn summarize(stats: &BuildStats) -> String {
  if stats.objects_compiled == 0 && stats.artifacts_linked == 0 {
    return "nothing to do".to_string();
  }
  format!(
    "{} compiled, {} linked",
    plural(stats.objects_compiled, "object"),
    plural(stats.artifacts_linked, "artifact")
  )
}

pub fn print_stats(stats: &BuildStats) {
  print_stat("Objects compiled", &stats.objects_compiled.to_string());
  print_stat("Dependency scans", &stats.dependency_scans.to_string());
  print_stat("Artifacts linked", &stats.artifacts_linked.to_string());
  print_stat("Up to date", &stats.up_to_date_targets.to_string());
  print_stat("Failed", &stats.failed_targets.to_string());
}
