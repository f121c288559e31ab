mod output;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use bslua_lib::BuildError;
use bslua_lib::compiler::BuildOptions;
use bslua_lib::consts::{DEFAULT_ACTION, DEFAULT_BUILD_FILE, DEFAULT_PROJECT_FILE};
use bslua_lib::error::exit_code;
use bslua_lib::eval::{RunSummary, evaluate};
use bslua_lib::exec::{DryRunRunner, ShellRunner, TaskRunner};
use bslua_lib::session::SessionOptions;

use output::{format_duration, print_error, print_info, print_stats, print_success, print_warning, summarize};

/// bs - Incremental C/C++ builds described in Lua
#[derive(Parser)]
#[command(name = "bs")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Build description file loaded from the current directory
  #[arg(short = 'f', long = "file", default_value = DEFAULT_BUILD_FILE)]
  file: String,

  /// Project description file searched from the current directory upwards
  #[arg(short = 'p', long = "project", default_value = DEFAULT_PROJECT_FILE)]
  project: String,

  /// Skip dependency checks and nested targets
  #[arg(long)]
  fast: bool,

  /// Print commands instead of running them
  #[arg(short = 'n', long)]
  dry_run: bool,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,

  /// Default variant tags, comma separated or repeated
  #[arg(long = "variant", value_delimiter = ',')]
  variants: Vec<String>,

  /// Actions to run: a target, `target.method` or a Lua function
  actions: Vec<String>,

  /// Arguments passed through to the actions
  #[arg(last = true)]
  args: Vec<String>,
}

impl Cli {
  fn session_options(&self) -> SessionOptions {
    SessionOptions {
      build_file: self.file.clone(),
      project_file: self.project.clone(),
      variants: self.variants.clone(),
      actions: self.actions.clone(),
      args: self.args.clone(),
      build: BuildOptions {
        dry_run: self.dry_run,
        fast: self.fast,
        verbose: self.verbose,
      },
    }
  }
}

fn init_tracing(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn install_interrupt_handler() -> Arc<AtomicBool> {
  let interrupted = Arc::new(AtomicBool::new(false));
  let flag = Arc::clone(&interrupted);
  if let Err(err) = ctrlc::set_handler(move || {
    flag.store(true, Ordering::SeqCst);
    eprintln!("\nInterrupted, stopping after the current command...");
  }) {
    warn!(error = %err, "cannot install the interrupt handler");
  }
  interrupted
}

fn run(cli: &Cli, interrupted: Arc<AtomicBool>) -> Result<RunSummary> {
  let cwd = std::env::current_dir().context("Failed to get current directory")?;
  debug!(dir = %cwd.display(), actions = ?cli.actions, "starting");
  let runner: Box<dyn TaskRunner> = if cli.dry_run {
    Box::new(DryRunRunner)
  } else {
    Box::new(ShellRunner::with_interrupt_flag(interrupted))
  };
  Ok(evaluate(&cwd, cli.session_options(), runner)?)
}

fn report(cli: &Cli, summary: &RunSummary, started: Instant) -> i32 {
  let elapsed = format_duration(started.elapsed());
  if cli.fast {
    print_warning("fast mode: nested targets were skipped, the build may be incomplete");
  }
  if cli.verbose > 0 {
    print_stats(&summary.stats);
  }

  if summary.success {
    if cli.dry_run {
      print_info(&format!("Dry run complete in {}", elapsed));
    } else {
      print_success(&format!("Done in {} ({})", elapsed, summarize(&summary.stats)));
    }
    return 0;
  }

  if summary.failed.is_empty() {
    print_error(&format!("Build failed: the '{}' action reported failure", DEFAULT_ACTION));
  }
  for name in &summary.failed {
    print_error(&BuildError::TargetFailed(name.clone()).to_string());
  }
  exit_code::TARGET_FAILED
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let interrupted = install_interrupt_handler();
  let started = Instant::now();

  let code = match run(&cli, interrupted) {
    Ok(summary) => report(&cli, &summary, started),
    Err(err) => {
      print_error(&format!("{:#}", err));
      err
        .downcast_ref::<BuildError>()
        .map_or(exit_code::CONFIG, BuildError::exit_code)
    }
  };
  std::process::exit(code);
}
